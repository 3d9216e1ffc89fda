//! DOM operations for a page session.

use std::path::Path;

use serde_json::json;

use crate::error::CdpError;
use crate::protocol::BoxModel;

use super::core::PageSession;

impl PageSession {
    /// Node id of the document root.
    async fn document_root(&self) -> Result<i64, CdpError> {
        let result = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        result["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing document root".to_string()))
    }

    /// Query selector; `None` when nothing matches.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let root = self.document_root().await?;

        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({
                    "nodeId": root,
                    "selector": selector,
                })),
            )
            .await?;

        match result["nodeId"].as_i64() {
            Some(0) | None => Ok(None),
            Some(id) => Ok(Some(id)),
        }
    }

    /// Query selector all.
    pub async fn query_selector_all(&self, selector: &str) -> Result<Vec<i64>, CdpError> {
        let root = self.document_root().await?;

        let result = self
            .call(
                "DOM.querySelectorAll",
                Some(json!({
                    "nodeId": root,
                    "selector": selector,
                })),
            )
            .await?;

        let node_ids: Vec<i64> = result["nodeIds"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default();

        Ok(node_ids)
    }

    /// Box model for a node; `None` when the node has no layout (hidden,
    /// detached, zero-size).
    pub async fn get_box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            // -32000: "Could not compute box model" for nodes without layout
            Err(CdpError::Protocol { code: -32000, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Attributes of a node as name/value pairs.
    pub async fn get_attributes(&self, node_id: i64) -> Result<Vec<(String, String)>, CdpError> {
        let result = self
            .call("DOM.getAttributes", Some(json!({"nodeId": node_id})))
            .await?;

        // CDP returns a flat [name, value, name, value, ...] array
        let flat: Vec<String> = result["attributes"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(flat.chunks_exact(2).map(|c| (c[0].clone(), c[1].clone())).collect())
    }

    /// Attach local files to a file input, bypassing the OS picker.
    ///
    /// This is the only upload path available to a headless session.
    pub async fn set_file_input_files(
        &self,
        node_id: i64,
        files: &[&Path],
    ) -> Result<(), CdpError> {
        let files: Vec<String> = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        self.call(
            "DOM.setFileInputFiles",
            Some(json!({
                "nodeId": node_id,
                "files": files,
            })),
        )
        .await?;
        Ok(())
    }

    /// Outer HTML of a node.
    pub async fn get_outer_html(&self, node_id: i64) -> Result<String, CdpError> {
        let result = self
            .call("DOM.getOuterHTML", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(result["outerHTML"].as_str().unwrap_or_default().to_string())
    }

    /// Focus element.
    pub async fn focus(&self, node_id: i64) -> Result<(), CdpError> {
        self.call("DOM.focus", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(())
    }

    /// Replace the value of an input element (select-all, then type).
    pub async fn set_node_value(&self, node_id: i64, value: &str) -> Result<(), CdpError> {
        self.focus(node_id).await?;
        self.press_key_combo("Control+a").await?;
        self.type_text(value).await?;
        Ok(())
    }

    /// Click the center of a node's content box.
    pub async fn click_node(&self, node_id: i64) -> Result<(), CdpError> {
        let box_model = self
            .get_box_model(node_id)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(format!("node {} not visible", node_id)))?;

        let (x, y) = Self::quad_center(&box_model.content);
        self.click(x, y).await
    }

    /// Center point of a CDP quad.
    pub(crate) fn quad_center(quad: &[f64]) -> (f64, f64) {
        if quad.len() >= 8 {
            let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
            let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
            (x, y)
        } else {
            (0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_center() {
        let quad = [10.0, 20.0, 30.0, 20.0, 30.0, 40.0, 10.0, 40.0];
        assert_eq!(PageSession::quad_center(&quad), (20.0, 30.0));
    }

    #[test]
    fn test_quad_center_short_quad() {
        assert_eq!(PageSession::quad_center(&[1.0, 2.0]), (0.0, 0.0));
    }
}
