//! Workflow stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The ordered stages of the editorial workflow.
///
/// The sequence is linear; the only branch anywhere is a stage failing
/// instead of reaching its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Upload,
    WaitUploadTranscode,
    PlaceOnTimeline,
    RenameProject,
    ZoomIn,
    PositionClip,
    ResetPlayhead,
    ZoomOut,
    Trim,
    Split,
    SelectRightSegment,
    DeleteRightSegment,
    SelectRegion,
    InvokeCutout,
    EnableCutout,
    WaitCutoutComplete,
    InvokeExport,
    InvokeDownload,
    ConfirmExport,
    WaitDownloadReady,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 20] = [
        Stage::Upload,
        Stage::WaitUploadTranscode,
        Stage::PlaceOnTimeline,
        Stage::RenameProject,
        Stage::ZoomIn,
        Stage::PositionClip,
        Stage::ResetPlayhead,
        Stage::ZoomOut,
        Stage::Trim,
        Stage::Split,
        Stage::SelectRightSegment,
        Stage::DeleteRightSegment,
        Stage::SelectRegion,
        Stage::InvokeCutout,
        Stage::EnableCutout,
        Stage::WaitCutoutComplete,
        Stage::InvokeExport,
        Stage::InvokeDownload,
        Stage::ConfirmExport,
        Stage::WaitDownloadReady,
    ];

    /// Stage name for logs and screenshot filenames.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::WaitUploadTranscode => "wait-upload-transcode",
            Stage::PlaceOnTimeline => "place-on-timeline",
            Stage::RenameProject => "rename-project",
            Stage::ZoomIn => "zoom-in",
            Stage::PositionClip => "position-clip",
            Stage::ResetPlayhead => "reset-playhead",
            Stage::ZoomOut => "zoom-out",
            Stage::Trim => "trim",
            Stage::Split => "split",
            Stage::SelectRightSegment => "select-right-segment",
            Stage::DeleteRightSegment => "delete-right-segment",
            Stage::SelectRegion => "select-region",
            Stage::InvokeCutout => "invoke-cutout",
            Stage::EnableCutout => "enable-cutout",
            Stage::WaitCutoutComplete => "wait-cutout-complete",
            Stage::InvokeExport => "invoke-export",
            Stage::InvokeDownload => "invoke-download",
            Stage::ConfirmExport => "confirm-export",
            Stage::WaitDownloadReady => "wait-download-ready",
        }
    }

    /// Whether a failure here happened after export was requested.
    ///
    /// Failures past that point are reported differently: the remote
    /// side may already have rendered the result, so the catalog entry
    /// is marked export-failed rather than plain failed.
    pub fn is_export_phase(&self) -> bool {
        *self >= Stage::InvokeExport
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_sorted_and_complete() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert_eq!(Stage::ALL.len(), 20);
    }

    #[test]
    fn test_export_phase_boundary() {
        assert!(!Stage::WaitCutoutComplete.is_export_phase());
        assert!(Stage::InvokeExport.is_export_phase());
        assert!(Stage::WaitDownloadReady.is_export_phase());
    }
}
