//! The job driver.
//!
//! `run` is the whole contract: check the input exists, lease an editor
//! (failing fast with no browser interaction when the pool is empty),
//! open a page, navigate, run the stage machine, and, on every path,
//! release the lease and close the page. Failures are classified by the
//! stage they occurred in, and each one leaves a diagnostic screenshot
//! behind.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use clippilot_registry::EditorRegistry;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, StageFailure};
use crate::job::{Job, JobReport};
use crate::page::EditorPage;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::status::{StatusSink, VideoStatus};
use crate::workflow::Workflow;

/// A page opened for one job.
pub struct ProvidedPage {
    pub page: Arc<dyn EditorPage>,
    /// The job's isolated download directory.
    pub download_dir: PathBuf,
    /// Opaque handle for closing the page.
    pub target: String,
}

/// Opens and closes job pages.
///
/// The production implementation sits on the session manager
/// ([`crate::bridge::CdpPageProvider`]); tests substitute a fake, which
/// is also how the "no session is acquired when admission fails"
/// property is asserted.
#[async_trait]
pub trait PageProvider: Send + Sync {
    async fn open(&self, job: &Job) -> Result<ProvidedPage, PipelineError>;
    async fn close(&self, page: &ProvidedPage) -> Result<(), PipelineError>;
}

/// Outcome of the driven portion, before lease release.
enum DriveError {
    /// Failed before any stage ran (page open, navigation).
    Setup(PipelineError),
    /// A stage failed; carries the stage tag for classification.
    Stage(StageFailure),
}

/// Top-level orchestrator for one job at a time.
pub struct JobDriver {
    registry: Arc<EditorRegistry>,
    provider: Arc<dyn PageProvider>,
    config: PipelineConfig,
    progress: Arc<dyn ProgressSink>,
    status: Arc<dyn StatusSink>,
}

impl JobDriver {
    pub fn new(
        registry: Arc<EditorRegistry>,
        provider: Arc<dyn PageProvider>,
        config: PipelineConfig,
        progress: Arc<dyn ProgressSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            registry,
            provider,
            config,
            progress,
            status,
        }
    }

    /// Run one job to its terminal state.
    pub async fn run(&self, job: &Job) -> Result<JobReport, PipelineError> {
        // The input must exist before anything is leased or opened.
        if !tokio::fs::try_exists(&job.input).await.unwrap_or(false) {
            return Err(PipelineError::VideoFileNotFound(job.input.clone()));
        }

        // Admission. The registry arbiter guarantees that of two
        // concurrent admissions racing for the last editor, exactly one
        // gets here and the other fails with NoResourceAvailable.
        let lease = self.registry.clone().lease_first().await?;
        let editor_url = lease.url().to_string();

        let _ = self
            .status
            .set_status(&job.item_name, VideoStatus::Processing)
            .await;
        self.emit(job, format!("admitted on {}", editor_url)).await;

        let outcome = self.drive(job, &editor_url).await;

        // The lease goes back on every path, before the result is
        // surfaced to the caller.
        if let Err(e) = lease.release().await {
            warn!("failed to release editor {}: {}", editor_url, e);
        }

        match outcome {
            Ok(report) => {
                let _ = self
                    .status
                    .set_status(&job.item_name, VideoStatus::Exported)
                    .await;
                self.emit(job, format!("exported to {}", report.output.display()))
                    .await;
                Ok(report)
            }
            Err(DriveError::Setup(e)) => {
                let _ = self
                    .status
                    .set_status(&job.item_name, VideoStatus::Failed)
                    .await;
                Err(e)
            }
            Err(DriveError::Stage(failure)) => {
                // Classification is positional: past the export request
                // the remote render may already exist.
                let status = if failure.stage.is_export_phase() {
                    VideoStatus::ExportFailed
                } else {
                    VideoStatus::Failed
                };
                let _ = self.status.set_status(&job.item_name, status).await;
                Err(failure.into())
            }
        }
    }

    async fn drive(&self, job: &Job, editor_url: &str) -> Result<JobReport, DriveError> {
        let provided = self.provider.open(job).await.map_err(DriveError::Setup)?;

        let outcome = self.navigate_and_run(job, editor_url, &provided).await;

        if let Err(e) = self.provider.close(&provided).await {
            warn!("failed to close page {} for job {}: {}", provided.target, job.id, e);
        }

        outcome
    }

    async fn navigate_and_run(
        &self,
        job: &Job,
        editor_url: &str,
        provided: &ProvidedPage,
    ) -> Result<JobReport, DriveError> {
        if let Err(e) = provided
            .page
            .navigate(editor_url, self.config.navigation_timeout())
            .await
        {
            self.capture_snapshot(provided, job, "navigation").await;
            return Err(DriveError::Setup(PipelineError::NavigationFailed {
                url: editor_url.to_string(),
                reason: e.to_string(),
            }));
        }

        let workflow = Workflow::new(
            provided.page.as_ref(),
            &self.config,
            job,
            self.progress.as_ref(),
            self.status.as_ref(),
            &provided.download_dir,
        );

        match workflow.run().await {
            Ok((output, stages)) => Ok(JobReport {
                job_id: job.id,
                output,
                stages,
            }),
            Err(failure) => {
                self.capture_snapshot(provided, job, failure.stage.name()).await;
                Err(DriveError::Stage(failure))
            }
        }
    }

    /// Best-effort diagnostic screenshot into the debug directory.
    async fn capture_snapshot(&self, provided: &ProvidedPage, job: &Job, label: &str) {
        let bytes = match provided.page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("screenshot capture failed for job {}: {}", job.id, e);
                return;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.config.debug_dir).await {
            warn!("could not create debug dir: {}", e);
            return;
        }

        let path = self.config.debug_dir.join(format!("{}-{}.jpg", job.id, label));
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => info!("diagnostic screenshot: {}", path.display()),
            Err(e) => warn!("could not write screenshot: {}", e),
        }
    }

    async fn emit(&self, job: &Job, message: impl Into<String>) {
        let message = message.into();
        info!(job = %job.id, "{}", message);
        self.progress
            .emit(ProgressEvent::new(job.id, message))
            .await;
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
