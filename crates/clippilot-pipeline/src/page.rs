//! The page seam the pipeline drives.
//!
//! `EditorPage` is the narrow async surface every stage and locator
//! strategy consumes. The production implementation sits on a CDP page
//! session ([`crate::bridge`]); tests script a fake. Keeping the trait
//! this small is what makes the stage machine testable without a
//! browser.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::geometry::{Point, Rect};

/// Opaque DOM node handle.
pub type NodeId = i64;

/// Observed state of the background-removal switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchState {
    /// The switch reports checked/on.
    pub checked: bool,
    /// A loading indicator is still visible next to it.
    pub busy: bool,
}

/// Async surface of the remote editor page.
#[async_trait]
pub trait EditorPage: Send + Sync {
    /// Navigate and wait for the document, bounded by `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PipelineError>;

    /// Query a selector once.
    async fn query(&self, selector: &str) -> Result<Option<NodeId>, PipelineError>;

    /// Poll a selector until it appears or `timeout` elapses; `None` on
    /// timeout.
    async fn wait_for(&self, selector: &str, timeout: Duration)
    -> Result<Option<NodeId>, PipelineError>;

    /// Rendered bounds of a node; `None` when it has no layout.
    async fn bounds(&self, node: NodeId) -> Result<Option<Rect>, PipelineError>;

    /// Attribute value of a node.
    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, PipelineError>;

    /// Live value of an input element.
    async fn input_value(&self, node: NodeId) -> Result<Option<String>, PipelineError>;

    /// Replace the value of an input element.
    async fn set_input_value(&self, node: NodeId, value: &str) -> Result<(), PipelineError>;

    /// Visible text of a node.
    async fn text_content(&self, node: NodeId) -> Result<Option<String>, PipelineError>;

    /// Attach a local file to a file input.
    async fn attach_file(&self, node: NodeId, file: &Path) -> Result<(), PipelineError>;

    /// Click the center of a node.
    async fn click_node(&self, node: NodeId) -> Result<(), PipelineError>;

    /// Click at a point.
    async fn click_at(&self, point: Point) -> Result<(), PipelineError>;

    /// Double-click at a point.
    async fn double_click_at(&self, point: Point) -> Result<(), PipelineError>;

    /// Press-move-release drag in discrete steps.
    async fn drag(&self, from: Point, to: Point, steps: u32) -> Result<(), PipelineError>;

    /// Press a key (or shortcut) on the page.
    async fn press_key(&self, key: &str) -> Result<(), PipelineError>;

    /// Type text into the focused element.
    async fn type_text(&self, text: &str) -> Result<(), PipelineError>;

    /// Computed cursor style of the element under a point.
    async fn cursor_at(&self, point: Point) -> Result<Option<String>, PipelineError>;

    /// Center of the first generic element whose text matches one of
    /// the keywords.
    async fn find_text(&self, keywords: &[&str]) -> Result<Option<Point>, PipelineError>;

    /// Find and mark a toggle adjacent to text matching the keywords;
    /// returns its node.
    async fn find_labeled_switch(&self, keywords: &[&str])
    -> Result<Option<NodeId>, PipelineError>;

    /// Observed state of the previously marked switch.
    async fn switch_state(&self, keywords: &[&str]) -> Result<Option<SwitchState>, PipelineError>;

    /// Find and mark the media thumbnail whose title matches `name`.
    async fn find_media_item(&self, name: &str) -> Result<Option<NodeId>, PipelineError>;

    /// Whether the media item still shows a processing overlay with a
    /// non-zero rendered area. `None` when the item is not on the page
    /// yet.
    async fn media_item_busy(&self, name: &str) -> Result<Option<bool>, PipelineError>;

    /// JPEG screenshot of the page.
    async fn screenshot(&self) -> Result<Vec<u8>, PipelineError>;
}
