//! Navigation and wait operations for a page session.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::error::CdpError;

use super::core::PageSession;

impl PageSession {
    /// Navigate to a URL and wait for the document to load, bounded by
    /// `timeout`.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText") {
            return Err(CdpError::NavigationFailed(
                error.as_str().unwrap_or("Unknown error").to_string(),
            ));
        }

        self.wait_for_load(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Wait for `document.readyState` to reach interactive/complete.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let start = tokio::time::Instant::now();

        loop {
            let result = self.evaluate("document.readyState").await?;

            if let Some(state) = result.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Poll for a selector until it appears or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout rather than an error: the caller is
    /// usually a locator strategy for which absence just means "try the
    /// next strategy".
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<i64>, CdpError> {
        let start = tokio::time::Instant::now();

        loop {
            if let Some(node_id) = self.query_selector(selector).await? {
                return Ok(Some(node_id));
            }

            if start.elapsed() > timeout {
                return Ok(None);
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
