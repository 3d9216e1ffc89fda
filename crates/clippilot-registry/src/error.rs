//! Registry errors.

use thiserror::Error;

/// Registry error types.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No editor is free at admission time.
    #[error("No editor available")]
    NoEditorAvailable,

    /// Lease requested for an editor that is already in use.
    #[error("Editor already leased: {0}")]
    EditorUnavailable(String),

    /// Editor URL not present in the registry.
    #[error("Unknown editor: {0}")]
    UnknownEditor(String),

    /// Store read/write failure.
    #[error("Store error: {0}")]
    Store(String),
}
