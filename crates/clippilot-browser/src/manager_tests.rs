use super::*;
use crate::config::SessionConfig;

fn test_config(root: &std::path::Path) -> SessionConfig {
    SessionConfig {
        // A port nothing listens on, so probes fail fast.
        debug_port: 1,
        download_root: root.join("downloads"),
        profile_dir: Some(root.join("profile")),
        ..SessionConfig::default()
    }
}

#[test]
fn test_endpoint_format() {
    let cfg = SessionConfig {
        debug_port: 9999,
        ..SessionConfig::default()
    };
    assert_eq!(cfg.endpoint(), "http://localhost:9999");
}

#[test]
fn test_profile_dir_override() {
    let cfg = SessionConfig {
        profile_dir: Some(std::path::PathBuf::from("/tmp/profile-x")),
        ..SessionConfig::default()
    };
    assert_eq!(cfg.profile_dir(), std::path::PathBuf::from("/tmp/profile-x"));
}

#[tokio::test]
async fn test_liveness_probe_fails_without_browser() {
    let tmp = tempfile::TempDir::new().unwrap();
    let manager = SessionManager::new(test_config(tmp.path()));
    assert!(!manager.is_chrome_running().await);
}

#[tokio::test]
async fn test_close_page_requires_connection() {
    let tmp = tempfile::TempDir::new().unwrap();
    let manager = SessionManager::new(test_config(tmp.path()));
    // No acquire() has happened, so there is no client to close against.
    assert!(manager.client.read().await.is_none());
}
