//! The workflow stage machine.
//!
//! Twenty stages, strictly sequential, each a function of the page and
//! the job's parameters. A stage either completes or converts the run
//! into a [`StageFailure`] carrying its tag; there is no other
//! branching. Stage timeouts are local: a slow transcode spends none
//! of the render wait's budget.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::detect::{self, DownloadWatcher};
use crate::error::{PipelineError, StageFailure};
use crate::geometry::{ClipGeometry, Point, Rect, drag_distance};
use crate::job::{Job, StageRecord};
use crate::locator::{Located, Resolver, UiAction};
use crate::page::{EditorPage, NodeId};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::stage::Stage;
use crate::status::{StatusSink, VideoStatus};

/// Label text the background-removal switch sits next to.
const CUTOUT_KEYWORDS: &[&str] = &["remove background", "cutout"];

/// One run of the editorial workflow against one page.
pub struct Workflow<'a> {
    page: &'a dyn EditorPage,
    cfg: &'a PipelineConfig,
    job: &'a Job,
    progress: &'a dyn ProgressSink,
    status: &'a dyn StatusSink,
    download_dir: &'a Path,

    /// Measured after the clip lands on the timeline.
    geometry: Option<ClipGeometry>,
    /// Output filename, best known source first: export dialog field,
    /// then download link attributes, else none (blind directory diff).
    expected_filename: Option<String>,
    /// Snapshot taken before the download is triggered.
    watcher: Option<DownloadWatcher>,
    /// The collected file, set by the final stage.
    output: Option<PathBuf>,
}

impl<'a> Workflow<'a> {
    pub fn new(
        page: &'a dyn EditorPage,
        cfg: &'a PipelineConfig,
        job: &'a Job,
        progress: &'a dyn ProgressSink,
        status: &'a dyn StatusSink,
        download_dir: &'a Path,
    ) -> Self {
        Self {
            page,
            cfg,
            job,
            progress,
            status,
            download_dir,
            geometry: None,
            expected_filename: None,
            watcher: None,
            output: None,
        }
    }

    /// Run all stages to completion or the first failure.
    pub async fn run(mut self) -> Result<(PathBuf, Vec<StageRecord>), StageFailure> {
        let mut records = Vec::with_capacity(Stage::ALL.len());

        for stage in Stage::ALL {
            let started = tokio::time::Instant::now();
            match self.step(stage).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    records.push(StageRecord { stage, elapsed });
                    self.emit(format!("{} done ({:.1}s)", stage, elapsed.as_secs_f64()))
                        .await;
                }
                Err(source) => {
                    self.emit(format!(
                        "{} failed after {:.1}s: {}",
                        stage,
                        started.elapsed().as_secs_f64(),
                        source
                    ))
                    .await;
                    return Err(StageFailure::new(stage, source));
                }
            }
        }

        let output = self.output.take().ok_or_else(|| {
            StageFailure::new(
                Stage::WaitDownloadReady,
                PipelineError::DownloadNotFound("no output was recorded".to_string()),
            )
        })?;

        Ok((output, records))
    }

    async fn step(&mut self, stage: Stage) -> Result<(), PipelineError> {
        debug!(job = %self.job.id, %stage, "entering stage");
        match stage {
            Stage::Upload => self.upload().await,
            Stage::WaitUploadTranscode => self.wait_upload_transcode().await,
            Stage::PlaceOnTimeline => self.place_on_timeline().await,
            Stage::RenameProject => self.rename_project().await,
            Stage::ZoomIn => self.zoom(UiAction::ZoomInButton).await,
            Stage::PositionClip => self.position_clip().await,
            Stage::ResetPlayhead => self.reset_playhead().await,
            Stage::ZoomOut => self.zoom(UiAction::ZoomOutButton).await,
            Stage::Trim => self.trim().await,
            Stage::Split => self.split().await,
            Stage::SelectRightSegment => self.select_right_segment().await,
            Stage::DeleteRightSegment => self.delete_right_segment().await,
            Stage::SelectRegion => self.select_region().await,
            Stage::InvokeCutout => self.invoke_cutout().await,
            Stage::EnableCutout => self.enable_cutout().await,
            Stage::WaitCutoutComplete => self.wait_cutout_complete().await,
            Stage::InvokeExport => self.invoke_export().await,
            Stage::InvokeDownload => self.invoke_download().await,
            Stage::ConfirmExport => self.confirm_export().await,
            Stage::WaitDownloadReady => self.wait_download_ready().await,
        }
    }

    // ------------------------------------------------------------------
    // Stage implementations
    // ------------------------------------------------------------------

    async fn upload(&mut self) -> Result<(), PipelineError> {
        let input = match self.resolve(UiAction::UploadInput).await {
            Ok(Located::Node(node)) => node,
            // The input is often rendered only after the upload button
            // opens its panel.
            _ => {
                let button = self.resolve(UiAction::UploadButton).await?;
                self.activate(button).await?;
                match self.resolve(UiAction::UploadInput).await? {
                    Located::Node(node) => node,
                    _ => {
                        return Err(PipelineError::Page(
                            "upload input did not resolve to a node".to_string(),
                        ));
                    }
                }
            }
        };

        self.page.attach_file(input, &self.job.input).await?;
        self.emit(format!("uploading {}", self.job.input.display())).await;
        Ok(())
    }

    async fn wait_upload_transcode(&mut self) -> Result<(), PipelineError> {
        detect::wait_media_ready(self.page, &self.job.item_name, self.cfg.upload.timing()).await
    }

    async fn place_on_timeline(&mut self) -> Result<(), PipelineError> {
        if let Some(item) = self.page.find_media_item(&self.job.item_name).await? {
            match self.resolve(UiAction::AddToTimeline).await {
                Ok(located) => self.activate(located).await?,
                Err(_) => {
                    let rect = self.page.bounds(item).await?.ok_or_else(|| {
                        PipelineError::Page("media item has no layout".to_string())
                    })?;
                    self.page.double_click_at(rect.center()).await?;
                }
            }
        } else {
            // Thumbnail container not found; go by the visible label.
            let point = self
                .page
                .find_text(&[self.job.item_name.as_str()])
                .await?
                .ok_or(PipelineError::ActionNotLocatable(UiAction::AddToTimeline))?;
            self.page.double_click_at(point).await?;
        }

        // The clip is on the timeline now; measure the canvas once and
        // derive everything else from it.
        let canvas = match self.resolve(UiAction::TimelineCanvas).await? {
            Located::Node(node) => self.page.bounds(node).await?.ok_or_else(|| {
                PipelineError::Page("timeline canvas has no layout".to_string())
            })?,
            _ => {
                return Err(PipelineError::Page(
                    "timeline canvas did not resolve to a node".to_string(),
                ));
            }
        };

        self.geometry = Some(ClipGeometry {
            canvas,
            track_offset: self.cfg.track_offset_px,
            clip_left: canvas.x,
        });
        debug!("timeline canvas: {:?}", canvas);
        Ok(())
    }

    async fn rename_project(&mut self) -> Result<(), PipelineError> {
        match self.resolve(UiAction::ProjectNameField).await? {
            Located::Node(node) => {
                self.page.set_input_value(node, &self.job.item_name).await?;
            }
            Located::Point(point) => {
                self.page.click_at(point).await?;
                self.page.type_text(&self.job.item_name).await?;
            }
            Located::Key(_) => {
                return Err(PipelineError::Page(
                    "project name field resolved to a shortcut".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn zoom(&mut self, action: UiAction) -> Result<(), PipelineError> {
        let located = self.resolve(action).await?;
        self.activate(located).await
    }

    async fn position_clip(&mut self) -> Result<(), PipelineError> {
        let geo = self.geometry()?;

        // Wherever the editor dropped the clip, move its left edge to
        // the canvas origin on the target track.
        let clip = match self.page.query("[class*=\"timeline\"] [class*=\"clip\"]").await? {
            Some(node) => self.page.bounds(node).await?,
            None => None,
        };
        let (from, half_width) = match clip {
            Some(rect) => (rect.center(), rect.width / 2.0),
            None => (geo.canvas.center(), 0.0),
        };
        let to = Point::new(
            geo.canvas.x + half_width,
            geo.canvas.y + geo.track_offset,
        );

        self.page.drag(from, to, self.cfg.drag_steps).await?;
        self.geometry = Some(ClipGeometry {
            clip_left: geo.canvas.x,
            ..geo
        });
        Ok(())
    }

    async fn reset_playhead(&mut self) -> Result<(), PipelineError> {
        self.page.press_key("Home").await
    }

    async fn trim(&mut self) -> Result<(), PipelineError> {
        let geo = self.geometry()?;
        let track_y = geo.canvas.y + geo.track_offset;
        let region = Rect::new(
            geo.clip_left,
            track_y - 20.0,
            geo.canvas.right() - geo.clip_left,
            40.0,
        );

        let handle = match Resolver::resize_handle(region, self.cfg).resolve(self.page).await? {
            Located::Point(point) => point,
            _ => {
                return Err(PipelineError::Page(
                    "resize handle did not resolve to a point".to_string(),
                ));
            }
        };

        let current_width = handle.x - geo.clip_left;
        let distance = drag_distance(
            current_width,
            self.job.target_duration_secs,
            self.cfg.px_per_sec,
        );

        if distance > 0.0 {
            self.page
                .drag(
                    handle,
                    Point::new(handle.x + distance, handle.y),
                    self.cfg.drag_steps,
                )
                .await?;
            self.emit(format!("stretched clip by {:.0}px", distance)).await;
        } else {
            // Already at or past the target width; the split takes care
            // of the excess.
            debug!(
                "clip width {:.0}px covers target {:.0}px, no drag",
                current_width,
                self.cfg.target_width_px()
            );
        }
        Ok(())
    }

    async fn split(&mut self) -> Result<(), PipelineError> {
        let geo = self.geometry()?;

        // Park the playhead on the ruler at the split position.
        let split_x = geo.time_to_x(self.job.target_duration_secs, self.cfg.px_per_sec);
        self.page
            .click_at(Point::new(split_x, geo.canvas.y + 6.0))
            .await?;

        let split = self.resolve(UiAction::SplitButton).await?;
        self.activate(split).await
    }

    async fn select_right_segment(&mut self) -> Result<(), PipelineError> {
        // A split always yields exactly two segments with the new one on
        // the right; select it just inside the canvas edge.
        let geo = self.geometry()?;
        self.page
            .click_at(geo.right_segment_point(self.cfg.right_inset_px))
            .await
    }

    async fn delete_right_segment(&mut self) -> Result<(), PipelineError> {
        let delete = self.resolve(UiAction::DeleteButton).await?;
        self.activate(delete).await
    }

    async fn select_region(&mut self) -> Result<(), PipelineError> {
        let geo = self.geometry()?;
        let mid = geo.clip_left + self.cfg.target_width_px() / 2.0;
        self.page.click_at(geo.track_point(mid)).await
    }

    async fn invoke_cutout(&mut self) -> Result<(), PipelineError> {
        let cutout = self.resolve(UiAction::CutoutButton).await?;
        self.activate(cutout).await
    }

    async fn enable_cutout(&mut self) -> Result<(), PipelineError> {
        match self.resolve(UiAction::CutoutSwitch).await? {
            Located::Node(node) => {
                if !self.switch_checked(node).await? {
                    self.page.click_node(node).await?;
                }
            }
            Located::Point(point) => self.page.click_at(point).await?,
            Located::Key(key) => self.page.press_key(key).await?,
        }
        Ok(())
    }

    async fn wait_cutout_complete(&mut self) -> Result<(), PipelineError> {
        detect::wait_cutout_applied(self.page, CUTOUT_KEYWORDS, self.cfg.cutout.timing()).await?;
        // Milestone: the remote side has done irreversible work now.
        let _ = self
            .status
            .set_status(&self.job.item_name, VideoStatus::EffectApplied)
            .await;
        self.emit("background removed").await;
        Ok(())
    }

    async fn invoke_export(&mut self) -> Result<(), PipelineError> {
        // Snapshot before anything can start a download.
        self.watcher = Some(DownloadWatcher::snapshot(self.download_dir).await?);

        let export = self.resolve(UiAction::ExportButton).await?;
        self.activate(export).await?;

        // Best source of the output name: the dialog's name field.
        if let Ok(Located::Node(node)) = self.resolve(UiAction::ExportNameField).await {
            if let Some(value) = self.page.input_value(node).await? {
                let value = value.trim();
                if !value.is_empty() {
                    debug!("export name from dialog field: {}", value);
                    self.expected_filename = Some(value.to_string());
                }
            }
        }
        Ok(())
    }

    async fn invoke_download(&mut self) -> Result<(), PipelineError> {
        let located = self.resolve(UiAction::DownloadOption).await?;

        // Second-best source of the output name: the link itself.
        if self.expected_filename.is_none() {
            if let Located::Node(node) = &located {
                self.expected_filename = self.link_filename(*node).await?;
            }
        }

        self.activate(located).await
    }

    async fn confirm_export(&mut self) -> Result<(), PipelineError> {
        let confirm = self.resolve(UiAction::ConfirmExportButton).await?;
        self.activate(confirm).await
    }

    async fn wait_download_ready(&mut self) -> Result<(), PipelineError> {
        let watcher = self
            .watcher
            .as_ref()
            .ok_or_else(|| PipelineError::Page("download watcher missing".to_string()))?;

        // With a known name, watch tightly for it; with none, fall back
        // to the coarser blind window accepting any stable new file.
        let (expected, timing) = match self.expected_filename.as_deref() {
            Some(name) => (Some(name), self.cfg.download.timing()),
            None => (None, self.cfg.download_blind.timing()),
        };

        let path = watcher
            .wait_for_download(expected, timing, self.cfg.download_stable_checks)
            .await?;

        self.emit(format!("downloaded {}", path.display())).await;
        self.output = Some(path);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn resolve(&self, action: UiAction) -> Result<Located, PipelineError> {
        Resolver::for_action(action, self.cfg).resolve(self.page).await
    }

    async fn activate(&self, located: Located) -> Result<(), PipelineError> {
        match located {
            Located::Node(node) => self.page.click_node(node).await,
            Located::Point(point) => self.page.click_at(point).await,
            Located::Key(key) => self.page.press_key(key).await,
        }
    }

    fn geometry(&self) -> Result<ClipGeometry, PipelineError> {
        self.geometry
            .ok_or_else(|| PipelineError::Page("timeline geometry not measured".to_string()))
    }

    async fn switch_checked(&self, node: NodeId) -> Result<bool, PipelineError> {
        if self.page.attribute(node, "aria-checked").await?.as_deref() == Some("true") {
            return Ok(true);
        }
        Ok(self.page.attribute(node, "checked").await?.is_some())
    }

    async fn link_filename(&self, node: NodeId) -> Result<Option<String>, PipelineError> {
        if let Some(name) = self.page.attribute(node, "download").await? {
            if !name.is_empty() {
                debug!("export name from download attribute: {}", name);
                return Ok(Some(name));
            }
        }
        if let Some(href) = self.page.attribute(node, "href").await? {
            if let Some(name) = href.rsplit('/').next().filter(|s| !s.is_empty()) {
                debug!("export name from href: {}", name);
                return Ok(Some(name.to_string()));
            }
        }
        if let Some(text) = self.page.text_content(node).await? {
            let text = text.trim();
            if !text.is_empty() {
                debug!("export name from link text: {}", text);
                return Ok(Some(text.to_string()));
            }
        }
        Ok(None)
    }

    async fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        info!(job = %self.job.id, "{}", message);
        self.progress
            .emit(ProgressEvent::new(self.job.id, message))
            .await;
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
