//! Scripted fakes for pipeline tests.
//!
//! `FakePage` answers the [`EditorPage`] surface from lookup tables and
//! queues, recording every interaction so tests can assert on clicks,
//! drags and key presses. It never sleeps, so paused-clock tests stay
//! deterministic.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{PageProvider, ProvidedPage};
use crate::error::PipelineError;
use crate::geometry::{Point, Rect};
use crate::job::Job;
use crate::page::{EditorPage, NodeId, SwitchState};
use crate::status::{StatusSink, VideoStatus};

#[derive(Default)]
pub(crate) struct FakePage {
    /// Selector → node for scripted hits.
    pub selectors: Mutex<HashMap<String, NodeId>>,
    /// When set, every CSS query resolves to this node.
    pub resolve_all_css: Option<NodeId>,
    /// Bounds returned for nodes not in `bounds`.
    pub default_bounds: Option<Rect>,
    pub bounds: Mutex<HashMap<NodeId, Rect>>,
    pub attributes: Mutex<HashMap<(NodeId, String), String>>,
    pub input_values: Mutex<HashMap<NodeId, String>>,
    pub texts: Mutex<HashMap<NodeId, String>>,
    /// Keyword → point hits for `find_text`.
    pub text_hits: Mutex<Vec<(Vec<String>, Point)>>,
    pub switch_node: Mutex<Option<NodeId>>,
    /// Successive `switch_state` answers; the last one repeats.
    pub switch_states: Mutex<VecDeque<SwitchState>>,
    pub media_item: Mutex<Option<NodeId>>,
    /// Successive `media_item_busy` answers; the last one repeats.
    pub media_busy: Mutex<VecDeque<Option<bool>>>,
    /// Region where `cursor_at` reports a resize cursor.
    pub resize_band: Mutex<Option<Rect>>,
    pub fail_navigation: bool,

    // Interaction recorders.
    pub navigations: Mutex<Vec<String>>,
    pub wait_for_calls: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<Point>>,
    pub node_clicks: Mutex<Vec<NodeId>>,
    pub double_clicks: Mutex<Vec<Point>>,
    pub drags: Mutex<Vec<(Point, Point, u32)>>,
    pub keys: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<String>>,
    pub attached: Mutex<Vec<(NodeId, PathBuf)>>,
    pub set_values: Mutex<Vec<(NodeId, String)>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page scripted for the whole happy path: every selector hits
    /// node 1, the canvas occupies `canvas`, the transcode overlay
    /// clears on the second poll, and the cutout switch settles after
    /// one busy poll.
    pub fn happy(canvas: Rect, resize_band: Rect) -> Self {
        let page = Self {
            resolve_all_css: Some(1),
            default_bounds: Some(canvas),
            ..Self::default()
        };
        *page.media_item.lock().unwrap() = Some(2);
        page.media_busy
            .lock()
            .unwrap()
            .extend([Some(true), Some(false)]);
        page.switch_states.lock().unwrap().extend([
            SwitchState { checked: true, busy: true },
            SwitchState { checked: true, busy: false },
        ]);
        *page.resize_band.lock().unwrap() = Some(resize_band);
        page.input_values
            .lock()
            .unwrap()
            .insert(1, "My 🎬 Clip!!.mp4".to_string());
        page
    }

    fn lookup(&self, selector: &str) -> Option<NodeId> {
        if let Some(node) = self.resolve_all_css {
            return Some(node);
        }
        self.selectors.lock().unwrap().get(selector).copied()
    }

    fn pop_or_last<T: Copy>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut q = queue.lock().unwrap();
        if q.len() > 1 {
            q.pop_front()
        } else {
            q.front().copied()
        }
    }
}

#[async_trait]
impl EditorPage for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), PipelineError> {
        self.navigations.lock().unwrap().push(url.to_string());
        if self.fail_navigation {
            return Err(PipelineError::Page("net::ERR_CONNECTION_REFUSED".into()));
        }
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<NodeId>, PipelineError> {
        Ok(self.lookup(selector))
    }

    async fn wait_for(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Option<NodeId>, PipelineError> {
        self.wait_for_calls.lock().unwrap().push(selector.to_string());
        Ok(self.lookup(selector))
    }

    async fn bounds(&self, node: NodeId) -> Result<Option<Rect>, PipelineError> {
        if let Some(rect) = self.bounds.lock().unwrap().get(&node) {
            return Ok(Some(*rect));
        }
        Ok(self.default_bounds)
    }

    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, PipelineError> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(node, name.to_string()))
            .cloned())
    }

    async fn input_value(&self, node: NodeId) -> Result<Option<String>, PipelineError> {
        Ok(self.input_values.lock().unwrap().get(&node).cloned())
    }

    async fn set_input_value(&self, node: NodeId, value: &str) -> Result<(), PipelineError> {
        self.set_values.lock().unwrap().push((node, value.to_string()));
        Ok(())
    }

    async fn text_content(&self, node: NodeId) -> Result<Option<String>, PipelineError> {
        Ok(self.texts.lock().unwrap().get(&node).cloned())
    }

    async fn attach_file(&self, node: NodeId, file: &Path) -> Result<(), PipelineError> {
        self.attached.lock().unwrap().push((node, file.to_path_buf()));
        Ok(())
    }

    async fn click_node(&self, node: NodeId) -> Result<(), PipelineError> {
        self.node_clicks.lock().unwrap().push(node);
        Ok(())
    }

    async fn click_at(&self, point: Point) -> Result<(), PipelineError> {
        self.clicks.lock().unwrap().push(point);
        Ok(())
    }

    async fn double_click_at(&self, point: Point) -> Result<(), PipelineError> {
        self.double_clicks.lock().unwrap().push(point);
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point, steps: u32) -> Result<(), PipelineError> {
        self.drags.lock().unwrap().push((from, to, steps));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), PipelineError> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), PipelineError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn cursor_at(&self, point: Point) -> Result<Option<String>, PipelineError> {
        let band = *self.resize_band.lock().unwrap();
        let cursor = match band {
            Some(b)
                if point.x >= b.x
                    && point.x <= b.right()
                    && point.y >= b.y
                    && point.y <= b.bottom() =>
            {
                "col-resize"
            }
            _ => "default",
        };
        Ok(Some(cursor.to_string()))
    }

    async fn find_text(&self, keywords: &[&str]) -> Result<Option<Point>, PipelineError> {
        let hits = self.text_hits.lock().unwrap();
        for (words, point) in hits.iter() {
            if keywords
                .iter()
                .any(|k| words.iter().any(|w| w.eq_ignore_ascii_case(k)))
            {
                return Ok(Some(*point));
            }
        }
        Ok(None)
    }

    async fn find_labeled_switch(
        &self,
        _keywords: &[&str],
    ) -> Result<Option<NodeId>, PipelineError> {
        Ok(*self.switch_node.lock().unwrap())
    }

    async fn switch_state(
        &self,
        _keywords: &[&str],
    ) -> Result<Option<SwitchState>, PipelineError> {
        Ok(Self::pop_or_last(&self.switch_states))
    }

    async fn find_media_item(&self, _name: &str) -> Result<Option<NodeId>, PipelineError> {
        Ok(*self.media_item.lock().unwrap())
    }

    async fn media_item_busy(&self, _name: &str) -> Result<Option<bool>, PipelineError> {
        Ok(Self::pop_or_last(&self.media_busy).flatten())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

/// Page provider serving one fake page, counting opens and closes.
pub(crate) struct FakeProvider {
    pub page: Arc<FakePage>,
    pub download_dir: PathBuf,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeProvider {
    pub fn new(page: Arc<FakePage>, download_dir: PathBuf) -> Self {
        Self {
            page,
            download_dir,
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageProvider for FakeProvider {
    async fn open(&self, _job: &Job) -> Result<ProvidedPage, PipelineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ProvidedPage {
            page: self.page.clone(),
            download_dir: self.download_dir.clone(),
            target: "fake-target".to_string(),
        })
    }

    async fn close(&self, _page: &ProvidedPage) -> Result<(), PipelineError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Status sink that records every update.
#[derive(Default)]
pub(crate) struct CollectingStatusSink {
    pub updates: Mutex<Vec<(String, VideoStatus)>>,
}

#[async_trait]
impl StatusSink for CollectingStatusSink {
    async fn set_status(&self, item: &str, status: VideoStatus) -> Result<(), PipelineError> {
        self.updates.lock().unwrap().push((item.to_string(), status));
        Ok(())
    }
}
