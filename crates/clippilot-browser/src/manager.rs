//! Session manager: Chrome process ownership and page lifecycle.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use clippilot_cdp::{CdpClient, PageSession};

use crate::config::SessionConfig;
use crate::error::BrowserError;

/// A page opened for one job, with its isolated download directory.
pub struct JobPage {
    pub session: Arc<PageSession>,
    pub download_dir: PathBuf,
}

/// Owns the process-wide Chrome handle.
///
/// The browser is launched lazily, reused across jobs while a liveness
/// probe succeeds, and replaced when it fails. A probe failure never
/// hands the stale client to a job.
pub struct SessionManager {
    config: SessionConfig,
    client: RwLock<Option<Arc<CdpClient>>>,
    /// Chrome process handle (if we launched it).
    chrome_process: RwLock<Option<Child>>,
}

impl SessionManager {
    /// Create a new session manager. No browser is started yet.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            chrome_process: RwLock::new(None),
        }
    }

    /// Find a Chrome executable.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths = [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: [&str; 0] = [];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Probe the debug endpoint for liveness.
    async fn is_chrome_running(&self) -> bool {
        reqwest::get(format!("{}/json/version", self.config.endpoint()))
            .await
            .is_ok()
    }

    /// Launch Chrome with remote debugging enabled.
    async fn launch_chrome(&self) -> Result<Child, BrowserError> {
        let chrome_path = Self::find_chrome().ok_or(BrowserError::ChromeNotFound)?;
        let profile_dir = self.config.profile_dir();

        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!("Launching Chrome with profile at: {}", profile_dir.display());

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", self.config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg(format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if self.config.headless {
            cmd.arg("--headless=new");
        }
        for extra in &self.config.extra_args {
            cmd.arg(extra);
        }

        let child = cmd
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Return a live CDP client, reusing the current browser when the
    /// liveness probe passes and launching a fresh one otherwise.
    ///
    /// A launch failure is surfaced to the caller; it is fatal to the
    /// job, not retried here.
    pub async fn acquire(&self) -> Result<Arc<CdpClient>, BrowserError> {
        // Reuse only a browser that still answers the version probe.
        if self.client.read().await.is_some() {
            if self.is_chrome_running().await {
                if let Some(client) = self.client.read().await.as_ref() {
                    return Ok(client.clone());
                }
            } else {
                warn!("Browser liveness probe failed, discarding stale session");
                *self.client.write().await = None;
                if let Some(mut child) = self.chrome_process.write().await.take() {
                    let _ = child.kill().await;
                }
            }
        }

        if !self.is_chrome_running().await {
            info!(
                "Chrome not running on port {}, launching...",
                self.config.debug_port
            );

            let child = self.launch_chrome().await?;
            *self.chrome_process.write().await = Some(child);

            let mut attempts = 0;
            let max_attempts = 50;
            while attempts < max_attempts {
                tokio::time::sleep(Duration::from_millis(200)).await;
                if self.is_chrome_running().await {
                    break;
                }
                attempts += 1;
            }

            if attempts >= max_attempts {
                return Err(BrowserError::LaunchFailed(
                    "Chrome failed to start within timeout".to_string(),
                ));
            }
        } else {
            debug!("Chrome already running on port {}", self.config.debug_port);
        }

        let client = Arc::new(CdpClient::connect(&self.config.endpoint()).await?);
        *self.client.write().await = Some(client.clone());

        info!("Connected to Chrome at {}", self.config.endpoint());
        Ok(client)
    }

    /// Open a fresh page for a job, with downloads routed into
    /// `<download_root>/<job_id>/`.
    pub async fn new_page(&self, job_id: &str) -> Result<JobPage, BrowserError> {
        let client = self.acquire().await?;

        let download_dir = self.config.download_root.join(job_id);
        tokio::fs::create_dir_all(&download_dir)
            .await
            .map_err(|e| BrowserError::DownloadDir(e.to_string()))?;

        let session = client.new_page(None).await?;
        session.set_download_dir(&download_dir).await?;

        debug!(
            "Opened page {} for job {} (downloads: {})",
            session.target_id(),
            job_id,
            download_dir.display()
        );

        Ok(JobPage {
            session: Arc::new(session),
            download_dir,
        })
    }

    /// Close a job's page by target id. The job's editor lease is
    /// released by the driver, never as a side effect here.
    pub async fn close_page(&self, target_id: &str) -> Result<(), BrowserError> {
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(BrowserError::NotConnected)?;
        client.close_page(target_id).await?;
        debug!("Closed page {}", target_id);
        Ok(())
    }

    /// Shut down Chrome if this manager launched it.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        *self.client.write().await = None;
        if let Some(mut child) = self.chrome_process.write().await.take() {
            info!("Shutting down Chrome...");
            let _ = child.kill().await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
