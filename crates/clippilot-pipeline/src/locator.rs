//! Selector resolution: locating UI targets on an unstable DOM.
//!
//! The editor ships generated, hashed class names that change between
//! deployments, so no single selector stays valid for long. Every
//! logical action therefore resolves through an ordered strategy list:
//! structural CSS selectors first, then a text scan over generic
//! elements, then (for the resize handle) a cursor-style sweep, and
//! finally a keyboard shortcut where the editor has one. The first hit
//! wins; exhaustion is [`PipelineError::ActionNotLocatable`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::geometry::{Point, Rect};
use crate::page::{EditorPage, NodeId};

/// Logical UI targets of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    UploadInput,
    UploadButton,
    AddToTimeline,
    ProjectNameField,
    TimelineCanvas,
    ZoomInButton,
    ZoomOutButton,
    SplitButton,
    DeleteButton,
    CutoutButton,
    CutoutSwitch,
    ExportButton,
    ExportNameField,
    DownloadOption,
    ConfirmExportButton,
    ResizeHandle,
}

impl UiAction {
    pub fn name(&self) -> &'static str {
        match self {
            UiAction::UploadInput => "upload input",
            UiAction::UploadButton => "upload button",
            UiAction::AddToTimeline => "add-to-timeline control",
            UiAction::ProjectNameField => "project name field",
            UiAction::TimelineCanvas => "timeline canvas",
            UiAction::ZoomInButton => "zoom-in control",
            UiAction::ZoomOutButton => "zoom-out control",
            UiAction::SplitButton => "split button",
            UiAction::DeleteButton => "delete button",
            UiAction::CutoutButton => "background-removal entry",
            UiAction::CutoutSwitch => "background-removal switch",
            UiAction::ExportButton => "export button",
            UiAction::ExportNameField => "export name field",
            UiAction::DownloadOption => "download option",
            UiAction::ConfirmExportButton => "export confirm button",
            UiAction::ResizeHandle => "clip resize handle",
        }
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved target: something the workflow can act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    /// A DOM node.
    Node(NodeId),
    /// A viewport coordinate.
    Point(Point),
    /// A keyboard shortcut standing in for the element.
    Key(&'static str),
}

/// One way of finding a target. Returning `Ok(None)` means "not found,
/// try the next strategy"; errors are logged and also fall through, so
/// a flaky DOM query cannot abort a resolution that a later strategy
/// would have saved.
#[async_trait]
pub trait LocateStrategy: Send + Sync {
    /// Short description for the resolution log.
    fn describe(&self) -> String;

    async fn locate(&self, page: &dyn EditorPage) -> Result<Option<Located>, PipelineError>;
}

/// Structural CSS selector with its own short wait.
pub struct CssStrategy {
    selector: &'static str,
    wait: Duration,
}

impl CssStrategy {
    pub fn new(selector: &'static str, wait: Duration) -> Self {
        Self { selector, wait }
    }
}

#[async_trait]
impl LocateStrategy for CssStrategy {
    fn describe(&self) -> String {
        format!("css `{}`", self.selector)
    }

    async fn locate(&self, page: &dyn EditorPage) -> Result<Option<Located>, PipelineError> {
        let Some(node) = page.wait_for(self.selector, self.wait).await? else {
            return Ok(None);
        };
        // A node without layout is present but unusable; let the text
        // scan or keyboard fallback take over.
        match page.bounds(node).await? {
            Some(rect) if !rect.is_empty() => Ok(Some(Located::Node(node))),
            _ => Ok(None),
        }
    }
}

/// Text scan over generic elements, for when structure has churned but
/// labels have not.
pub struct TextScanStrategy {
    keywords: &'static [&'static str],
}

impl TextScanStrategy {
    pub fn new(keywords: &'static [&'static str]) -> Self {
        Self { keywords }
    }
}

#[async_trait]
impl LocateStrategy for TextScanStrategy {
    fn describe(&self) -> String {
        format!("text scan {:?}", self.keywords)
    }

    async fn locate(&self, page: &dyn EditorPage) -> Result<Option<Located>, PipelineError> {
        Ok(page.find_text(self.keywords).await?.map(Located::Point))
    }
}

/// Relational scan for a toggle adjacent to matching label text.
pub struct SwitchScanStrategy {
    keywords: &'static [&'static str],
}

impl SwitchScanStrategy {
    pub fn new(keywords: &'static [&'static str]) -> Self {
        Self { keywords }
    }
}

#[async_trait]
impl LocateStrategy for SwitchScanStrategy {
    fn describe(&self) -> String {
        format!("switch scan {:?}", self.keywords)
    }

    async fn locate(&self, page: &dyn EditorPage) -> Result<Option<Located>, PipelineError> {
        Ok(page
            .find_labeled_switch(self.keywords)
            .await?
            .map(Located::Node))
    }
}

/// Cursor-style sweep over a bounded region.
///
/// Walks a coarse grid asking the page for the rendered cursor at each
/// point; on a hit, probes right pixel by pixel to the last matching
/// column, which is the handle's outer edge. This is how the resize
/// handle is found: it has no stable selector at all, only a
/// `col-resize` cursor.
pub struct CursorScanStrategy {
    region: Rect,
    cursors: &'static [&'static str],
    step: f64,
    probe_delay: Duration,
}

impl CursorScanStrategy {
    pub fn new(
        region: Rect,
        cursors: &'static [&'static str],
        step: f64,
        probe_delay: Duration,
    ) -> Self {
        Self {
            region,
            cursors,
            step: step.max(1.0),
            probe_delay,
        }
    }

    async fn probe(&self, page: &dyn EditorPage, p: Point) -> Result<bool, PipelineError> {
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        let cursor = page.cursor_at(p).await?;
        Ok(cursor.is_some_and(|c| self.cursors.iter().any(|want| c == *want)))
    }
}

#[async_trait]
impl LocateStrategy for CursorScanStrategy {
    fn describe(&self) -> String {
        format!("cursor scan {:?} over {:?}", self.cursors, self.region)
    }

    async fn locate(&self, page: &dyn EditorPage) -> Result<Option<Located>, PipelineError> {
        let mut y = self.region.y;
        while y <= self.region.bottom() {
            let mut x = self.region.x;
            while x <= self.region.right() {
                if self.probe(page, Point::new(x, y)).await? {
                    // Narrow to the exact boundary by linear probing.
                    let mut edge = x;
                    while edge + 1.0 <= self.region.right()
                        && self.probe(page, Point::new(edge + 1.0, y)).await?
                    {
                        edge += 1.0;
                    }
                    debug!("cursor scan hit at ({}, {}), edge {}", x, y, edge);
                    return Ok(Some(Located::Point(Point::new(edge, y))));
                }
                x += self.step;
            }
            y += self.step;
        }
        Ok(None)
    }
}

/// Keyboard shortcut fallback; always succeeds.
pub struct KeyStrategy {
    key: &'static str,
}

impl KeyStrategy {
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }
}

#[async_trait]
impl LocateStrategy for KeyStrategy {
    fn describe(&self) -> String {
        format!("keyboard `{}`", self.key)
    }

    async fn locate(&self, _page: &dyn EditorPage) -> Result<Option<Located>, PipelineError> {
        Ok(Some(Located::Key(self.key)))
    }
}

/// Ordered strategy list for one action.
pub struct Resolver {
    action: UiAction,
    strategies: Vec<Box<dyn LocateStrategy>>,
}

impl Resolver {
    /// Resolver with an explicit strategy list.
    pub fn with_strategies(action: UiAction, strategies: Vec<Box<dyn LocateStrategy>>) -> Self {
        Self { action, strategies }
    }

    /// The built-in strategy list for an action.
    ///
    /// [`UiAction::ResizeHandle`] has no static list; it needs the
    /// measured timeline region, see [`Resolver::resize_handle`].
    pub fn for_action(action: UiAction, cfg: &PipelineConfig) -> Self {
        let wait = cfg.selector_wait();
        let css = |sel| Box::new(CssStrategy::new(sel, wait)) as Box<dyn LocateStrategy>;
        let text = |kw| Box::new(TextScanStrategy::new(kw)) as Box<dyn LocateStrategy>;
        let key = |k| Box::new(KeyStrategy::new(k)) as Box<dyn LocateStrategy>;

        let strategies: Vec<Box<dyn LocateStrategy>> = match action {
            UiAction::UploadInput => vec![
                css("input[type=\"file\"]"),
                css("[class*=\"upload\"] input[type=\"file\"]"),
            ],
            UiAction::UploadButton => vec![
                css("[data-testid=\"upload-button\"]"),
                css("[class*=\"upload\"] button"),
                text(&["upload", "import media", "add media"]),
            ],
            UiAction::AddToTimeline => vec![
                css("[data-testid=\"add-to-timeline\"]"),
                css("[class*=\"media-item\"] [class*=\"add\"]"),
                text(&["add to timeline"]),
            ],
            UiAction::ProjectNameField => vec![
                css("input[class*=\"project-name\"]"),
                css("[class*=\"header\"] input[type=\"text\"]"),
                css("input[placeholder*=\"roject\"]"),
            ],
            UiAction::TimelineCanvas => vec![
                css("[class*=\"timeline\"] canvas"),
                css("[class*=\"timeline\"][class*=\"track\"]"),
                css("[class*=\"timeline\"]"),
            ],
            UiAction::ZoomInButton => vec![
                css("[data-testid=\"zoom-in\"]"),
                css("[class*=\"zoom\"] button:last-child"),
                text(&["zoom in"]),
                key("="),
            ],
            UiAction::ZoomOutButton => vec![
                css("[data-testid=\"zoom-out\"]"),
                css("[class*=\"zoom\"] button:first-child"),
                text(&["zoom out"]),
                key("-"),
            ],
            UiAction::SplitButton => vec![
                css("[data-testid=\"split\"]"),
                css("[class*=\"toolbar\"] [class*=\"split\"]"),
                css("[class*=\"split-btn\"]"),
                css("button[title*=\"plit\"]"),
                css("[aria-label*=\"plit\"]"),
                css("[class*=\"icon-split\"]"),
                text(&["split"]),
                key("s"),
            ],
            UiAction::DeleteButton => vec![
                css("[data-testid=\"delete\"]"),
                css("[class*=\"toolbar\"] [class*=\"delete\"]"),
                css("button[title*=\"elete\"]"),
                css("[aria-label*=\"elete\"]"),
                text(&["delete", "remove"]),
                key("Delete"),
            ],
            UiAction::CutoutButton => vec![
                css("[data-testid=\"cutout\"]"),
                css("[class*=\"cutout\"]"),
                css("[class*=\"remove-bg\"]"),
                text(&["remove background", "smart cutout", "cutout"]),
            ],
            UiAction::CutoutSwitch => vec![
                css("[data-testid=\"cutout-switch\"]"),
                css("[class*=\"cutout\"] [role=\"switch\"]"),
                css("[class*=\"cutout\"] input[type=\"checkbox\"]"),
                Box::new(SwitchScanStrategy::new(&["remove background", "cutout"])),
            ],
            UiAction::ExportButton => vec![
                css("[data-testid=\"export\"]"),
                css("[class*=\"header\"] [class*=\"export\"]"),
                css("button[title*=\"xport\"]"),
                text(&["export"]),
            ],
            UiAction::ExportNameField => vec![
                css("[class*=\"export\"] input[type=\"text\"]"),
                css("[class*=\"dialog\"] input[type=\"text\"]"),
                css("[class*=\"modal\"] input"),
            ],
            UiAction::DownloadOption => vec![
                css("[data-testid=\"download\"]"),
                css("[class*=\"export\"] [class*=\"download\"]"),
                css("a[download]"),
                text(&["download"]),
            ],
            UiAction::ConfirmExportButton => vec![
                css("[class*=\"dialog\"] [class*=\"primary\"]"),
                css("[class*=\"modal\"] button[class*=\"confirm\"]"),
                text(&["export", "confirm"]),
            ],
            UiAction::ResizeHandle => Vec::new(),
        };

        Self { action, strategies }
    }

    /// Resolver for the clip's right-edge resize handle over the
    /// measured track region.
    pub fn resize_handle(region: Rect, cfg: &PipelineConfig) -> Self {
        Self::with_strategies(
            UiAction::ResizeHandle,
            vec![Box::new(CursorScanStrategy::new(
                region,
                &["col-resize", "ew-resize", "e-resize"],
                cfg.cursor_scan_step_px,
                cfg.cursor_probe_delay(),
            ))],
        )
    }

    /// Try strategies in order; first hit wins.
    ///
    /// Which strategy succeeded is logged on every resolution so that
    /// churn in the remote UI shows up in the logs long before the
    /// earlier strategies stop working entirely.
    pub async fn resolve(&self, page: &dyn EditorPage) -> Result<Located, PipelineError> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.locate(page).await {
                Ok(Some(located)) => {
                    info!(
                        action = %self.action,
                        strategy = index + 1,
                        "located via {}",
                        strategy.describe()
                    );
                    return Ok(located);
                }
                Ok(None) => {
                    debug!(
                        action = %self.action,
                        strategy = index + 1,
                        "miss: {}",
                        strategy.describe()
                    );
                }
                Err(e) => {
                    warn!(
                        action = %self.action,
                        strategy = index + 1,
                        "strategy {} errored: {}",
                        strategy.describe(),
                        e
                    );
                }
            }
        }

        warn!(action = %self.action, "all {} strategies exhausted", self.strategies.len());
        Err(PipelineError::ActionNotLocatable(self.action))
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
