//! Registry persistence.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::editor::Editor;
use crate::error::RegistryError;

/// Backing store for editor records.
///
/// The contract is the external store's: read the full list, write the
/// full list. There is no partial update and no compare-and-swap; the
/// [`crate::EditorRegistry`] arbiter provides the atomicity.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load all editors in registration order.
    async fn load(&self) -> Result<Vec<Editor>, RegistryError>;

    /// Replace the full editor list.
    async fn save(&self, editors: &[Editor]) -> Result<(), RegistryError>;
}

/// In-memory store for tests.
pub struct MemoryRegistryStore {
    editors: tokio::sync::RwLock<Vec<Editor>>,
}

impl MemoryRegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            editors: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    /// Create a store seeded with editors.
    pub fn with_editors(editors: Vec<Editor>) -> Self {
        Self {
            editors: tokio::sync::RwLock::new(editors),
        }
    }
}

impl Default for MemoryRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn load(&self) -> Result<Vec<Editor>, RegistryError> {
        Ok(self.editors.read().await.clone())
    }

    async fn save(&self, editors: &[Editor]) -> Result<(), RegistryError> {
        *self.editors.write().await = editors.to_vec();
        Ok(())
    }
}

/// JSON-file store: the whole registry is one document.
///
/// A missing file reads as an empty registry so first-run setups work
/// without bootstrapping.
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RegistryStore for FileRegistryStore {
    async fn load(&self) -> Result<Vec<Editor>, RegistryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| RegistryError::Store(format!("Failed to read registry file: {}", e)))?;

        let editors: Vec<Editor> = serde_json::from_str(&content)
            .map_err(|e| RegistryError::Store(format!("Failed to parse registry file: {}", e)))?;

        Ok(editors)
    }

    async fn save(&self, editors: &[Editor]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                RegistryError::Store(format!("Failed to create registry directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(editors)
            .map_err(|e| RegistryError::Store(format!("Failed to serialize registry: {}", e)))?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| RegistryError::Store(format!("Failed to write registry file: {}", e)))?;

        debug!("Saved {} editors to {:?}", editors.len(), self.path);
        Ok(())
    }
}
