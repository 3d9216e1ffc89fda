//! Pipeline configuration.
//!
//! Every wait in the workflow is a `{poll, timeout}` pair configured
//! here rather than a constant buried in a stage, so deployments can
//! tune them and tests can run the same code paths under a virtual
//! clock.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detect::Timing;

/// A serializable `{poll, timeout}` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_ms: u64,
    pub timeout_secs: u64,
}

impl TimingConfig {
    pub const fn new(poll_ms: u64, timeout_secs: u64) -> Self {
        Self { poll_ms, timeout_secs }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            poll: Duration::from_millis(self.poll_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new(1_000, 60)
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeline calibration: rendered pixels per second of media.
    pub px_per_sec: f64,
    /// Target clip duration in seconds.
    pub target_duration_secs: f64,
    /// Bound on loading an editor URL.
    pub navigation_timeout_secs: u64,
    /// Per-selector wait inside the locator's CSS strategies.
    pub selector_wait_secs: u64,
    /// Intermediate move events per synthetic drag.
    pub drag_steps: u32,
    /// Inset from the canvas right edge when selecting the right-hand
    /// split segment.
    pub right_inset_px: f64,
    /// Coarse grid step of the cursor-style sweep.
    pub cursor_scan_step_px: f64,
    /// Delay between cursor probes.
    pub cursor_probe_delay_ms: u64,
    /// Vertical offset from the canvas top to the target track.
    pub track_offset_px: f64,
    /// Upload + transcode wait (overlay removal).
    pub upload: TimingConfig,
    /// Background-removal wait (switch checked, loader gone).
    pub cutout: TimingConfig,
    /// Render/download wait when the output filename is known.
    pub download: TimingConfig,
    /// Render/download wait when no filename was ever resolved.
    pub download_blind: TimingConfig,
    /// Consecutive equal-size checks before a download counts as done.
    pub download_stable_checks: u32,
    /// Where diagnostic screenshots are written.
    pub debug_dir: PathBuf,
    /// Leases older than this are reclaimed at startup.
    pub max_lease_age_secs: u64,
}

impl PipelineConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_wait(&self) -> Duration {
        Duration::from_secs(self.selector_wait_secs)
    }

    pub fn cursor_probe_delay(&self) -> Duration {
        Duration::from_millis(self.cursor_probe_delay_ms)
    }

    /// Target clip width on the timeline, in pixels.
    pub fn target_width_px(&self) -> f64 {
        self.target_duration_secs * self.px_per_sec
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            px_per_sec: 30.0,
            target_duration_secs: 30.0,
            navigation_timeout_secs: 60,
            selector_wait_secs: 3,
            drag_steps: 12,
            right_inset_px: 8.0,
            cursor_scan_step_px: 4.0,
            cursor_probe_delay_ms: 10,
            track_offset_px: 110.0,
            upload: TimingConfig::new(1_000, 16 * 60),
            cutout: TimingConfig::new(5_000, 7 * 60),
            download: TimingConfig::new(2_000, 15 * 60),
            download_blind: TimingConfig::new(15_000, 10 * 60),
            download_stable_checks: 3,
            debug_dir: PathBuf::from("debug"),
            max_lease_age_secs: 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_calibration() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.target_width_px(), 900.0);
        assert_eq!(cfg.upload.timing().timeout, Duration::from_secs(960));
        assert_eq!(cfg.cutout.timing().poll, Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            target_duration_secs = 12.0
            [upload]
            poll_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.target_duration_secs, 12.0);
        assert_eq!(cfg.upload.poll_ms, 500);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.upload.timeout_secs, 60);
        assert_eq!(cfg.px_per_sec, 30.0);
    }
}
