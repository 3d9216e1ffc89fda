//! Job definition and terminal report.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::stage::Stage;

/// One editorial job: a local input file bound for one leased editor.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job ID; also names the job's download directory.
    pub id: Uuid,
    /// Local input video path.
    pub input: PathBuf,
    /// Catalog item name, derived from the input filename.
    pub item_name: String,
    /// Target clip duration in seconds.
    pub target_duration_secs: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a job for an input file.
    pub fn new(input: impl Into<PathBuf>, target_duration_secs: f64) -> Self {
        let input = input.into();
        let item_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());

        Self {
            id: Uuid::new_v4(),
            input,
            item_name,
            target_duration_secs,
            created_at: Utc::now(),
        }
    }
}

/// Elapsed time of one completed stage.
#[derive(Debug, Clone, Copy)]
pub struct StageRecord {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Terminal report of a successful job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    /// The collected export on local disk.
    pub output: PathBuf,
    /// Per-stage timings in execution order.
    pub stages: Vec<StageRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_from_stem() {
        let job = Job::new("/videos/My Clip.mp4", 30.0);
        assert_eq!(job.item_name, "My Clip");
    }

    #[test]
    fn test_item_name_fallback() {
        let job = Job::new("..", 30.0);
        assert_eq!(job.item_name, "untitled");
    }
}
