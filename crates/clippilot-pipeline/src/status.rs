//! Catalog status markers.
//!
//! The video catalog lives outside the pipeline; this is the narrow
//! interface it is updated through, called at fixed milestones: after
//! admission, after the effect completes, and at terminal states.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;

/// Lifecycle status of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoStatus {
    /// Admitted, waiting for an editor.
    Queued,
    /// A job is driving the editor.
    Processing,
    /// Background removal finished on the remote side.
    EffectApplied,
    /// Export completed and the file was collected.
    Exported,
    /// Failed after export was requested; the remote render may exist.
    ExportFailed,
    /// Failed before export was requested.
    Failed,
}

/// Writer for catalog status updates.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(&self, item: &str, status: VideoStatus) -> Result<(), PipelineError>;
}

/// Sink that only logs; used when no catalog is attached.
pub struct TracingStatusSink;

#[async_trait]
impl StatusSink for TracingStatusSink {
    async fn set_status(&self, item: &str, status: VideoStatus) -> Result<(), PipelineError> {
        info!(item, ?status, "status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&VideoStatus::EffectApplied).unwrap(),
            "\"effect-applied\""
        );
        assert_eq!(
            serde_json::to_string(&VideoStatus::ExportFailed).unwrap(),
            "\"export-failed\""
        );
    }
}
