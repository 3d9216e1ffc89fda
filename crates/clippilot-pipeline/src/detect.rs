//! Completion detectors.
//!
//! The remote editor exposes no completion events for its long
//! operations (transcode, background removal, render), so every wait
//! point is a bounded poll: a probe runs on a fixed interval until it
//! reports done or the budget elapses. Budgets are stage-local; a slow
//! upload never eats into the later render wait.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::filename;
use crate::page::EditorPage;

/// Poll interval and overall budget of one wait point.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub poll: Duration,
    pub timeout: Duration,
}

/// Poll `probe` every `timing.poll` until it yields a value or
/// `timing.timeout` elapses.
///
/// Runs on tokio time, so tests exercise the full 16-minute budgets
/// under `start_paused` virtual time instead of real sleeps.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timing: Timing,
    mut probe: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PipelineError>>,
{
    let deadline = tokio::time::Instant::now() + timing.timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(PipelineError::StageTimeout {
                what: what.to_string(),
                timeout: timing.timeout,
            });
        }

        tokio::time::sleep(timing.poll).await;
    }
}

/// Wait until the media item's processing overlay is gone.
///
/// The editor signals transcode completion by removing the overlay
/// inside that item's thumbnail container, or by collapsing its box to
/// zero area, which counts the same. The probe is scoped to the one
/// item; a sibling upload's overlay must not hold this job hostage.
pub async fn wait_media_ready(
    page: &dyn EditorPage,
    name: &str,
    timing: Timing,
) -> Result<(), PipelineError> {
    info!("waiting for upload/transcode of `{}`", name);
    poll_until("upload/transcode", timing, || async move {
        match page.media_item_busy(name).await? {
            // Not on the page yet: the upload is still registering.
            None => Ok(None),
            Some(true) => Ok(None),
            Some(false) => Ok(Some(())),
        }
    })
    .await
}

/// Wait until the background-removal switch reports checked with no
/// loading indicator beside it.
pub async fn wait_cutout_applied(
    page: &dyn EditorPage,
    keywords: &[&str],
    timing: Timing,
) -> Result<(), PipelineError> {
    info!("waiting for background removal");
    poll_until("background removal", timing, || async move {
        match page.switch_state(keywords).await? {
            Some(state) if state.checked && !state.busy => Ok(Some(())),
            _ => Ok(None),
        }
    })
    .await
}

/// Directory-diff download detector.
///
/// Snapshot the download directory before the export is triggered, then
/// poll for new files whose size has held still across consecutive
/// checks. Candidates are matched against the expected name through
/// [`filename::matches`] when one is known; in-progress browser files
/// are never candidates. This is deliberately the last resort in the
/// filename resolution order; the export dialog's field and the
/// download link's attributes are both consulted first.
pub struct DownloadWatcher {
    dir: PathBuf,
    baseline: HashSet<OsString>,
}

impl DownloadWatcher {
    /// Snapshot the directory's current contents.
    pub async fn snapshot(dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let dir = dir.into();
        let mut baseline = HashSet::new();

        if dir.exists() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                baseline.insert(entry.file_name());
            }
        }

        debug!("download snapshot of {:?}: {} entries", dir, baseline.len());
        Ok(Self { dir, baseline })
    }

    /// The watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn is_partial(name: &Path) -> bool {
        matches!(
            name.extension().and_then(|e| e.to_str()),
            Some("crdownload" | "part" | "tmp" | "download")
        )
    }

    /// Wait until a matching download has finished.
    ///
    /// "Finished" means the file's size was unchanged across
    /// `stable_checks` consecutive polls; the browser offers no better
    /// signal from outside.
    pub async fn wait_for_download(
        &self,
        expected: Option<&str>,
        timing: Timing,
        stable_checks: u32,
    ) -> Result<PathBuf, PipelineError> {
        let deadline = tokio::time::Instant::now() + timing.timeout;
        let mut sizes: HashMap<PathBuf, (u64, u32)> = HashMap::new();

        loop {
            if let Some(path) = self.scan(expected, &mut sizes, stable_checks).await? {
                info!("download complete: {:?}", path);
                return Ok(path);
            }

            if tokio::time::Instant::now() >= deadline {
                let what = expected.unwrap_or("(unknown filename)");
                return Err(PipelineError::DownloadNotFound(format!(
                    "no stable file matching `{}` in {:?} after {:?}",
                    what, self.dir, timing.timeout
                )));
            }

            tokio::time::sleep(timing.poll).await;
        }
    }

    /// One pass over the directory; updates size-stability bookkeeping.
    async fn scan(
        &self,
        expected: Option<&str>,
        sizes: &mut HashMap<PathBuf, (u64, u32)>,
        stable_checks: u32,
    ) -> Result<Option<PathBuf>, PipelineError> {
        if !self.dir.exists() {
            return Ok(None);
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if self.baseline.contains(&name) {
                continue;
            }

            let path = entry.path();
            if Self::is_partial(&path) {
                continue;
            }

            if let Some(expected) = expected {
                let candidate = name.to_string_lossy();
                if !filename::matches(expected, &candidate) {
                    debug!("ignoring non-matching download candidate {:?}", path);
                    continue;
                }
            }

            let size = entry.metadata().await?.len();
            match sizes.entry(path.clone()) {
                // First sighting starts the stability count at zero.
                Entry::Vacant(slot) => {
                    slot.insert((size, 0));
                }
                Entry::Occupied(mut slot) => {
                    let (last, count) = slot.get_mut();
                    if *last == size {
                        *count += 1;
                    } else {
                        *last = size;
                        *count = 0;
                    }
                    if *count >= stable_checks {
                        return Ok(Some(path));
                    }
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
