use super::*;
use crate::store::{FileRegistryStore, MemoryRegistryStore};
use tempfile::TempDir;

fn registry_with(urls: &[&str]) -> Arc<EditorRegistry> {
    let editors = urls.iter().map(|u| Editor::new(*u)).collect();
    Arc::new(EditorRegistry::new(Arc::new(
        MemoryRegistryStore::with_editors(editors),
    )))
}

#[tokio::test]
async fn test_lease_first_takes_listing_order() {
    let registry = registry_with(&["https://e/1", "https://e/2"]);

    let lease = registry.clone().lease_first().await.unwrap();
    assert_eq!(lease.url(), "https://e/1");

    let available = registry.list_available().await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].url, "https://e/2");

    lease.release().await.unwrap();
}

#[tokio::test]
async fn test_lease_first_empty_pool() {
    let registry = registry_with(&[]);
    let err = registry.clone().lease_first().await.unwrap_err();
    assert!(matches!(err, RegistryError::NoEditorAvailable));
}

#[tokio::test]
async fn test_lease_specific_already_in_use() {
    let registry = registry_with(&["https://e/1"]);

    let lease = registry.clone().lease("https://e/1").await.unwrap();
    let err = registry.clone().lease("https://e/1").await.unwrap_err();
    assert!(matches!(err, RegistryError::EditorUnavailable(_)));

    lease.release().await.unwrap();
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let registry = registry_with(&["https://e/1"]);

    let lease = registry.clone().lease_first().await.unwrap();
    lease.release().await.unwrap();

    // Second release of an already-available editor is a no-op.
    registry.release("https://e/1").await.unwrap();
    assert_eq!(registry.list_available().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_release_unknown_editor() {
    let registry = registry_with(&["https://e/1"]);
    let err = registry.release("https://e/other").await.unwrap_err();
    assert!(matches!(err, RegistryError::UnknownEditor(_)));
}

#[tokio::test]
async fn test_concurrent_admission_single_editor() {
    // Two admissions race for one editor: exactly one may win.
    let registry = registry_with(&["https://e/1"]);

    let r1 = registry.clone();
    let r2 = registry.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { r1.lease_first().await }),
        tokio::spawn(async move { r2.lease_first().await }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser.unwrap_err(), RegistryError::NoEditorAvailable));
}

#[tokio::test]
async fn test_dropped_guard_releases_eventually() {
    let registry = registry_with(&["https://e/1"]);

    {
        let _lease = registry.clone().lease_first().await.unwrap();
        assert!(registry.list_available().await.unwrap().is_empty());
        // Guard dropped here without explicit release.
    }

    // The drop path spawns the release; yield until it lands.
    for _ in 0..20 {
        tokio::task::yield_now().await;
        if !registry.list_available().await.unwrap().is_empty() {
            return;
        }
    }
    panic!("dropped lease was never released");
}

#[tokio::test]
async fn test_recover_stale_releases_old_leases() {
    let mut stale = Editor::new("https://e/1");
    stale.status = EditorStatus::InUse;
    stale.leased_at = Some(Utc::now() - Duration::hours(3));

    let mut fresh = Editor::new("https://e/2");
    fresh.status = EditorStatus::InUse;
    fresh.leased_at = Some(Utc::now());

    let registry = Arc::new(EditorRegistry::new(Arc::new(
        MemoryRegistryStore::with_editors(vec![stale, fresh]),
    )));

    let recovered = registry.recover_stale(Duration::hours(2)).await.unwrap();
    assert_eq!(recovered, 1);

    let available = registry.list_available().await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].url, "https://e/1");
}

#[tokio::test]
async fn test_add_and_remove() {
    let registry = registry_with(&[]);

    registry.add("https://e/1").await.unwrap();
    registry.add("https://e/1").await.unwrap(); // duplicate is a no-op
    registry.add("https://e/2").await.unwrap();
    assert_eq!(registry.list().await.unwrap().len(), 2);

    registry.remove("https://e/1").await.unwrap();
    assert_eq!(registry.list().await.unwrap().len(), 1);

    let err = registry.remove("https://e/1").await.unwrap_err();
    assert!(matches!(err, RegistryError::UnknownEditor(_)));
}

#[tokio::test]
async fn test_lease_survives_process_restart() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("registry.json");

    let registry = Arc::new(EditorRegistry::new(Arc::new(FileRegistryStore::new(&path))));
    registry.add("https://e/1").await.unwrap();
    let lease = registry.clone().lease_first().await.unwrap();

    // A second registry over the same file sees the lease.
    let registry2 = Arc::new(EditorRegistry::new(Arc::new(FileRegistryStore::new(&path))));
    assert!(registry2.list_available().await.unwrap().is_empty());

    lease.release().await.unwrap();
    assert_eq!(registry2.list_available().await.unwrap().len(), 1);
}
