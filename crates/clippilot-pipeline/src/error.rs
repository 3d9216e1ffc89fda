//! Pipeline error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use clippilot_browser::BrowserError;
use clippilot_registry::RegistryError;

use crate::locator::UiAction;
use crate::stage::Stage;

/// Pipeline error types.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No editor free at admission time. The caller may retry later;
    /// the pipeline never retries this itself.
    #[error("No editor resource available")]
    NoResourceAvailable,

    /// The input video does not exist.
    #[error("Video file not found: {0}")]
    VideoFileNotFound(PathBuf),

    /// The editor URL did not load within its bound.
    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// Every locator strategy for a required action failed.
    #[error("No strategy could locate {0}")]
    ActionNotLocatable(UiAction),

    /// A completion detector's bound elapsed without success.
    #[error("{what} did not complete within {timeout:?}")]
    StageTimeout { what: String, timeout: Duration },

    /// No matching output file appeared in the download window.
    #[error("Download not found: {0}")]
    DownloadNotFound(String),

    /// A page operation (DOM query, input, evaluation) failed.
    #[error("Page operation failed: {0}")]
    Page(String),

    /// Browser session error.
    #[error("Session error: {0}")]
    Session(String),

    /// Registry error other than pool exhaustion.
    #[error("Registry error: {0}")]
    Registry(RegistryError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A workflow stage failed; carries the stage tag.
    #[error(transparent)]
    StageFailed(Box<StageFailure>),
}

impl From<StageFailure> for PipelineError {
    fn from(failure: StageFailure) -> Self {
        PipelineError::StageFailed(Box::new(failure))
    }
}

impl From<RegistryError> for PipelineError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NoEditorAvailable => PipelineError::NoResourceAvailable,
            other => PipelineError::Registry(other),
        }
    }
}

impl From<BrowserError> for PipelineError {
    fn from(e: BrowserError) -> Self {
        PipelineError::Session(e.to_string())
    }
}

/// A stage failure with the stage it occurred in.
///
/// The stage tag is the classification mechanism: the catalog status
/// for a failed job is derived from where the failure happened, never
/// from matching substrings of the message.
#[derive(Debug, Error)]
#[error("Stage {stage} failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self { stage, source }
    }
}
