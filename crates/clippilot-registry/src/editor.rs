//! Editor lease records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lease status of an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorStatus {
    /// Free for the next job.
    Available,
    /// Held by a running job.
    InUse,
}

impl Default for EditorStatus {
    fn default() -> Self {
        EditorStatus::Available
    }
}

/// One leasable remote editor session.
///
/// Records are pre-provisioned externally; the pipeline only flips
/// their status and never creates or destroys them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Editor {
    /// Remote session URL; doubles as the editor's identity.
    pub url: String,
    /// Current lease status.
    #[serde(default)]
    pub status: EditorStatus,
    /// When the current lease was taken, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leased_at: Option<DateTime<Utc>>,
}

impl Editor {
    /// Create an available editor record.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: EditorStatus::Available,
            leased_at: None,
        }
    }

    /// Whether the editor is free.
    pub fn is_available(&self) -> bool {
        self.status == EditorStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EditorStatus::InUse).unwrap(),
            "\"in-use\""
        );
        assert_eq!(
            serde_json::to_string(&EditorStatus::Available).unwrap(),
            "\"available\""
        );
    }

    #[test]
    fn test_editor_round_trip() {
        let editor = Editor::new("https://editor.example.com/session/1");
        let json = serde_json::to_string(&editor).unwrap();
        let back: Editor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, editor);
        assert!(back.is_available());
    }
}
