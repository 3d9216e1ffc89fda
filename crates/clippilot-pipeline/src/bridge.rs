//! CDP-backed implementations of the pipeline's seams.
//!
//! `CdpEditorPage` adapts a [`PageSession`] to the [`EditorPage`]
//! trait; `CdpPageProvider` adapts the [`SessionManager`] to
//! [`PageProvider`]. DOM-shape knowledge (which class fragments mean
//! "processing overlay", how a toggle relates to its label) lives in
//! the JS snippets here; the control flow that polls them lives in
//! [`crate::detect`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use clippilot_browser::SessionManager;
use clippilot_cdp::{CdpError, PageSession, ScreenshotFormat};

use crate::driver::{PageProvider, ProvidedPage};
use crate::error::PipelineError;
use crate::geometry::{Point, Rect};
use crate::job::Job;
use crate::page::{EditorPage, NodeId, SwitchState};

fn page_err(e: CdpError) -> PipelineError {
    PipelineError::Page(e.to_string())
}

/// [`EditorPage`] over a live CDP page session.
pub struct CdpEditorPage {
    session: Arc<PageSession>,
}

impl CdpEditorPage {
    pub fn new(session: Arc<PageSession>) -> Self {
        Self { session }
    }

    /// Content-quad bounds as a rectangle.
    fn rect_from_quad(quad: &[f64]) -> Option<Rect> {
        if quad.len() < 8 {
            return None;
        }
        let xs = [quad[0], quad[2], quad[4], quad[6]];
        let ys = [quad[1], quad[3], quad[5], quad[7]];
        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Mark the first toggle whose enclosing label text matches; the
    /// marker attribute survives re-renders long enough to be queried.
    async fn mark_switch(&self, keywords: &[&str]) -> Result<bool, PipelineError> {
        let kws = serde_json::to_string(keywords).map_err(|e| PipelineError::Page(e.to_string()))?;
        let script = format!(
            r#"(() => {{
                const kws = {kws};
                const toggles = document.querySelectorAll('[role="switch"], input[type="checkbox"]');
                for (const el of toggles) {{
                    const scope = el.closest('label, li, section, div') || el.parentElement;
                    const t = scope ? (scope.textContent || '').trim().toLowerCase() : '';
                    if (t && t.length < 200 && kws.some(k => t.includes(k))) {{
                        document.querySelectorAll('[data-clippilot-switch]')
                            .forEach(m => m.removeAttribute('data-clippilot-switch'));
                        el.setAttribute('data-clippilot-switch', '1');
                        return true;
                    }}
                }}
                return false;
            }})()"#
        );
        let found = self.session.evaluate(&script).await.map_err(page_err)?;
        Ok(found.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl EditorPage for CdpEditorPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PipelineError> {
        self.session.navigate(url, timeout).await.map_err(page_err)
    }

    async fn query(&self, selector: &str) -> Result<Option<NodeId>, PipelineError> {
        self.session.query_selector(selector).await.map_err(page_err)
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<NodeId>, PipelineError> {
        self.session
            .wait_for_selector(selector, timeout)
            .await
            .map_err(page_err)
    }

    async fn bounds(&self, node: NodeId) -> Result<Option<Rect>, PipelineError> {
        let model = self.session.get_box_model(node).await.map_err(page_err)?;
        Ok(model.and_then(|m| Self::rect_from_quad(&m.content)))
    }

    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, PipelineError> {
        let attrs = self.session.get_attributes(node).await.map_err(page_err)?;
        Ok(attrs.into_iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }

    async fn input_value(&self, node: NodeId) -> Result<Option<String>, PipelineError> {
        // Focus the field, then read the live value off the active
        // element; input values are not attributes.
        self.session.focus(node).await.map_err(page_err)?;
        let value = self
            .session
            .evaluate(
                "(() => { const el = document.activeElement; \
                 return el && 'value' in el ? String(el.value) : null; })()",
            )
            .await
            .map_err(page_err)?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn set_input_value(&self, node: NodeId, value: &str) -> Result<(), PipelineError> {
        self.session.set_node_value(node, value).await.map_err(page_err)
    }

    async fn text_content(&self, node: NodeId) -> Result<Option<String>, PipelineError> {
        let html = self.session.get_outer_html(node).await.map_err(page_err)?;
        // Strip tags; enough for reading a link's label.
        let mut text = String::new();
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag => text.push(c),
                _ => {}
            }
        }
        let text = text.trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }

    async fn attach_file(&self, node: NodeId, file: &Path) -> Result<(), PipelineError> {
        self.session
            .set_file_input_files(node, &[file])
            .await
            .map_err(page_err)
    }

    async fn click_node(&self, node: NodeId) -> Result<(), PipelineError> {
        self.session.click_node(node).await.map_err(page_err)
    }

    async fn click_at(&self, point: Point) -> Result<(), PipelineError> {
        self.session.click(point.x, point.y).await.map_err(page_err)
    }

    async fn double_click_at(&self, point: Point) -> Result<(), PipelineError> {
        self.session
            .double_click(point.x, point.y)
            .await
            .map_err(page_err)
    }

    async fn drag(&self, from: Point, to: Point, steps: u32) -> Result<(), PipelineError> {
        self.session
            .drag(from.x, from.y, to.x, to.y, steps)
            .await
            .map_err(page_err)
    }

    async fn press_key(&self, key: &str) -> Result<(), PipelineError> {
        self.session.press_key(key).await.map_err(page_err)
    }

    async fn type_text(&self, text: &str) -> Result<(), PipelineError> {
        self.session.type_text(text).await.map_err(page_err)
    }

    async fn cursor_at(&self, point: Point) -> Result<Option<String>, PipelineError> {
        let script = format!(
            "(() => {{ const el = document.elementFromPoint({}, {}); \
             return el ? getComputedStyle(el).cursor : null; }})()",
            point.x, point.y
        );
        let value = self.session.evaluate(&script).await.map_err(page_err)?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn find_text(&self, keywords: &[&str]) -> Result<Option<Point>, PipelineError> {
        let kws = serde_json::to_string(keywords).map_err(|e| PipelineError::Page(e.to_string()))?;
        let script = format!(
            r#"(() => {{
                const kws = {kws};
                const els = document.querySelectorAll('button, [role="button"], a, span, div, li');
                for (const el of els) {{
                    const t = (el.textContent || '').trim().toLowerCase();
                    if (!t || t.length > 60) continue;
                    if (kws.some(k => t === k || t.includes(k))) {{
                        const r = el.getBoundingClientRect();
                        if (r.width > 0 && r.height > 0) {{
                            return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }};
                        }}
                    }}
                }}
                return null;
            }})()"#
        );
        let value = self.session.evaluate(&script).await.map_err(page_err)?;
        if value.is_null() {
            return Ok(None);
        }
        let point: Point =
            serde_json::from_value(value).map_err(|e| PipelineError::Page(e.to_string()))?;
        Ok(Some(point))
    }

    async fn find_labeled_switch(
        &self,
        keywords: &[&str],
    ) -> Result<Option<NodeId>, PipelineError> {
        if !self.mark_switch(keywords).await? {
            return Ok(None);
        }
        self.query("[data-clippilot-switch]").await
    }

    async fn switch_state(&self, keywords: &[&str]) -> Result<Option<SwitchState>, PipelineError> {
        // Re-marking is idempotent; the switch may have been located
        // through CSS without the marker, or re-rendered since.
        let _ = self.mark_switch(keywords).await?;

        let value = self
            .session
            .evaluate(
                r#"(() => {
                    const el = document.querySelector('[data-clippilot-switch]')
                        || document.querySelector('[class*="cutout"] [role="switch"], [role="switch"], input[type="checkbox"]');
                    if (!el) return null;
                    const checked = el.checked === true || el.getAttribute('aria-checked') === 'true';
                    const scope = el.closest('section, li, div') || document.body;
                    let busy = false;
                    for (const ind of scope.querySelectorAll('[class*="loading"], [class*="spinner"], [class*="progress"]')) {
                        const r = ind.getBoundingClientRect();
                        if (r.width > 0 && r.height > 0) { busy = true; break; }
                    }
                    return { checked, busy };
                })()"#,
            )
            .await
            .map_err(page_err)?;

        match value {
            Value::Null => Ok(None),
            v => Ok(Some(SwitchState {
                checked: v["checked"].as_bool().unwrap_or(false),
                busy: v["busy"].as_bool().unwrap_or(false),
            })),
        }
    }

    async fn find_media_item(&self, name: &str) -> Result<Option<NodeId>, PipelineError> {
        let name_js = serde_json::to_string(&name.to_lowercase())
            .map_err(|e| PipelineError::Page(e.to_string()))?;
        let script = format!(
            r#"(() => {{
                const name = {name_js};
                const items = document.querySelectorAll('[class*="media"], [class*="material"], [class*="asset"]');
                for (const el of items) {{
                    const label = ((el.getAttribute('title') || '') + ' ' + (el.textContent || '')).toLowerCase();
                    if (label.includes(name)) {{
                        document.querySelectorAll('[data-clippilot-item]')
                            .forEach(m => m.removeAttribute('data-clippilot-item'));
                        el.setAttribute('data-clippilot-item', '1');
                        return true;
                    }}
                }}
                return false;
            }})()"#
        );
        let found = self.session.evaluate(&script).await.map_err(page_err)?;
        if !found.as_bool().unwrap_or(false) {
            return Ok(None);
        }
        self.query("[data-clippilot-item]").await
    }

    async fn media_item_busy(&self, name: &str) -> Result<Option<bool>, PipelineError> {
        if self.find_media_item(name).await?.is_none() {
            return Ok(None);
        }

        // The overlay only counts while it still has rendered area; the
        // editor hides it by collapsing it before removing it.
        let value = self
            .session
            .evaluate(
                r#"(() => {
                    const el = document.querySelector('[data-clippilot-item]');
                    if (!el) return null;
                    for (const ov of el.querySelectorAll('[class*="processing"], [class*="loading"], [class*="uploading"], [class*="mask"]')) {
                        const r = ov.getBoundingClientRect();
                        if (r.width > 0 && r.height > 0) return true;
                    }
                    return false;
                })()"#,
            )
            .await
            .map_err(page_err)?;

        Ok(value.as_bool())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PipelineError> {
        let data = self
            .session
            .screenshot(ScreenshotFormat::Jpeg, Some(70))
            .await
            .map_err(page_err)?;
        BASE64
            .decode(data)
            .map_err(|e| PipelineError::Page(format!("screenshot decode: {}", e)))
    }
}

/// [`PageProvider`] over the shared session manager.
pub struct CdpPageProvider {
    manager: Arc<SessionManager>,
}

impl CdpPageProvider {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl PageProvider for CdpPageProvider {
    async fn open(&self, job: &Job) -> Result<ProvidedPage, PipelineError> {
        let job_page = self.manager.new_page(&job.id.to_string()).await?;
        let target = job_page.session.target_id().to_string();
        Ok(ProvidedPage {
            page: Arc::new(CdpEditorPage::new(job_page.session)),
            download_dir: job_page.download_dir,
            target,
        })
    }

    async fn close(&self, page: &ProvidedPage) -> Result<(), PipelineError> {
        self.manager.close_page(&page.target).await?;
        Ok(())
    }
}
