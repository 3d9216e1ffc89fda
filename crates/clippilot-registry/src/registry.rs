//! Lease/release arbiter over the backing store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::editor::{Editor, EditorStatus};
use crate::error::RegistryError;
use crate::store::RegistryStore;

/// Serializes every lease/release transition over the store.
///
/// The store contract is full-list read then full-list write; without a
/// single writer, two admissions arriving together can both observe the
/// same editor as available and both lease it. The `write_lock` makes
/// each read-modify-write atomic with respect to the others in this
/// process.
pub struct EditorRegistry {
    store: Arc<dyn RegistryStore>,
    write_lock: Mutex<()>,
}

impl EditorRegistry {
    /// Create a registry over the given store.
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All editors in registration order.
    pub async fn list(&self) -> Result<Vec<Editor>, RegistryError> {
        self.store.load().await
    }

    /// Available editors, in registration order.
    pub async fn list_available(&self) -> Result<Vec<Editor>, RegistryError> {
        Ok(self
            .store
            .load()
            .await?
            .into_iter()
            .filter(Editor::is_available)
            .collect())
    }

    /// Lease the first available editor (FIFO by listing order).
    pub async fn lease_first(self: Arc<Self>) -> Result<LeaseGuard, RegistryError> {
        let leased = self.lease_first_record().await?;
        Ok(LeaseGuard::new(self, leased))
    }

    async fn lease_first_record(&self) -> Result<Editor, RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        let Some(editor) = editors.iter_mut().find(|e| e.is_available()) else {
            return Err(RegistryError::NoEditorAvailable);
        };

        editor.status = EditorStatus::InUse;
        editor.leased_at = Some(Utc::now());
        let leased = editor.clone();

        self.store.save(&editors).await?;
        info!("Leased editor {}", leased.url);
        Ok(leased)
    }

    /// Lease a specific editor; fails if it is already in use.
    pub async fn lease(self: Arc<Self>, url: &str) -> Result<LeaseGuard, RegistryError> {
        let leased = self.lease_record(url).await?;
        Ok(LeaseGuard::new(self, leased))
    }

    async fn lease_record(&self, url: &str) -> Result<Editor, RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        let Some(editor) = editors.iter_mut().find(|e| e.url == url) else {
            return Err(RegistryError::UnknownEditor(url.to_string()));
        };

        if !editor.is_available() {
            return Err(RegistryError::EditorUnavailable(url.to_string()));
        }

        editor.status = EditorStatus::InUse;
        editor.leased_at = Some(Utc::now());
        let leased = editor.clone();

        self.store.save(&editors).await?;
        info!("Leased editor {}", leased.url);
        Ok(leased)
    }

    /// Return an editor to the pool. Releasing an editor that is already
    /// available is a no-op, not an error.
    pub async fn release(&self, url: &str) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        let Some(editor) = editors.iter_mut().find(|e| e.url == url) else {
            return Err(RegistryError::UnknownEditor(url.to_string()));
        };

        if editor.is_available() {
            debug!("Editor {} already available", url);
            return Ok(());
        }

        editor.status = EditorStatus::Available;
        editor.leased_at = None;
        self.store.save(&editors).await?;
        info!("Released editor {}", url);
        Ok(())
    }

    /// Register a new editor URL.
    pub async fn add(&self, url: &str) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        if editors.iter().any(|e| e.url == url) {
            return Ok(());
        }
        editors.push(Editor::new(url));
        self.store.save(&editors).await
    }

    /// Remove an editor from the pool.
    pub async fn remove(&self, url: &str) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        let before = editors.len();
        editors.retain(|e| e.url != url);
        if editors.len() == before {
            return Err(RegistryError::UnknownEditor(url.to_string()));
        }
        self.store.save(&editors).await
    }

    /// Release leases older than `max_age`.
    ///
    /// Run at startup: a lease that old can only belong to a process
    /// that died without reaching its cleanup path.
    pub async fn recover_stale(&self, max_age: Duration) -> Result<usize, RegistryError> {
        let _guard = self.write_lock.lock().await;

        let mut editors = self.store.load().await?;
        let cutoff = Utc::now() - max_age;
        let mut recovered = 0;

        for editor in editors.iter_mut() {
            if editor.status == EditorStatus::InUse
                && editor.leased_at.is_none_or(|t| t < cutoff)
            {
                warn!("Recovering stale lease on {}", editor.url);
                editor.status = EditorStatus::Available;
                editor.leased_at = None;
                recovered += 1;
            }
        }

        if recovered > 0 {
            self.store.save(&editors).await?;
        }
        Ok(recovered)
    }
}

/// Holds one leased editor and guarantees it is returned.
///
/// Call [`LeaseGuard::release`] on the normal paths; if the guard is
/// dropped without it (early return, panic during a stage), the release
/// is spawned best-effort so the pool never ends with a permanently
/// in-use record.
pub struct LeaseGuard {
    registry: Arc<EditorRegistry>,
    editor: Editor,
    released: bool,
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("editor", &self.editor)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl LeaseGuard {
    fn new(registry: Arc<EditorRegistry>, editor: Editor) -> Self {
        Self {
            registry,
            editor,
            released: false,
        }
    }

    /// The leased editor.
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// The leased editor's URL.
    pub fn url(&self) -> &str {
        &self.editor.url
    }

    /// Explicitly return the editor to the pool.
    pub async fn release(mut self) -> Result<(), RegistryError> {
        self.released = true;
        self.registry.release(&self.editor.url).await
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if !self.released {
            let url = self.editor.url.clone();
            warn!("Lease on {} dropped without explicit release", url);
            // Outside a runtime (process teardown) the startup stale-lease
            // recovery is the backstop instead.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let registry = self.registry.clone();
                handle.spawn(async move {
                    if let Err(e) = registry.release(&url).await {
                        warn!("Failed to release dropped lease on {}: {}", url, e);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
