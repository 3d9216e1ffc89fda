//! Mouse and keyboard synthesis for a page session.

use serde_json::json;
use tracing::debug;

use crate::error::CdpError;
use crate::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

impl PageSession {
    /// Click at coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.mouse_event(MouseEventType::MousePressed, x, y, 1).await?;
        self.mouse_event(MouseEventType::MouseReleased, x, y, 1).await?;
        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Double click at coordinates.
    pub async fn double_click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for click_count in [1, 2] {
            self.mouse_event(MouseEventType::MousePressed, x, y, click_count).await?;
            self.mouse_event(MouseEventType::MouseReleased, x, y, click_count).await?;
        }
        Ok(())
    }

    /// Press-move-release drag, broken into `steps` intermediate moves.
    ///
    /// The editor's drag recognition tracks continuous motion; a single
    /// jump from source to target is ignored, so each intermediate point
    /// is dispatched as its own move event with the button held.
    pub async fn drag(
        &self,
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
        steps: u32,
    ) -> Result<(), CdpError> {
        let steps = steps.max(1);

        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": from_x,
                "y": from_y,
            })),
        )
        .await?;
        self.mouse_event(MouseEventType::MousePressed, from_x, from_y, 1).await?;

        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            let x = from_x + (to_x - from_x) * t;
            let y = from_y + (to_y - from_y) * t;
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": MouseEventType::MouseMoved,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "buttons": 1,
                })),
            )
            .await?;
        }

        self.mouse_event(MouseEventType::MouseReleased, to_x, to_y, 1).await?;
        debug!(
            "Dragged ({}, {}) -> ({}, {}) in {} steps",
            from_x, from_y, to_x, to_y, steps
        );
        Ok(())
    }

    /// Type text into the focused element.
    pub async fn type_text(&self, text: &str) -> Result<(), CdpError> {
        self.call("Input.insertText", Some(json!({"text": text})))
            .await?;
        debug!("Typed {} characters", text.len());
        Ok(())
    }

    /// Press a key.
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        self.key_event(KeyEventType::KeyDown, key, 0).await?;
        self.key_event(KeyEventType::KeyUp, key, 0).await?;
        Ok(())
    }

    /// Press a key combination (e.g., "Control+a").
    pub async fn press_key_combo(&self, combo: &str) -> Result<(), CdpError> {
        let parts: Vec<&str> = combo.split('+').collect();
        let modifiers = Self::modifier_flags(&parts[..parts.len() - 1]);
        let key = parts.last().unwrap_or(&"");

        self.key_event(KeyEventType::KeyDown, key, modifiers).await?;
        self.key_event(KeyEventType::KeyUp, key, modifiers).await?;
        Ok(())
    }

    async fn mouse_event(
        &self,
        kind: MouseEventType,
        x: f64,
        y: f64,
        click_count: u32,
    ) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": kind,
                "x": x,
                "y": y,
                "button": MouseButton::Left,
                "clickCount": click_count,
            })),
        )
        .await?;
        Ok(())
    }

    async fn key_event(&self, kind: KeyEventType, key: &str, modifiers: i32) -> Result<(), CdpError> {
        let mut params = json!({
            "type": kind,
            "key": key,
        });
        if modifiers != 0 {
            params["modifiers"] = json!(modifiers);
        }
        self.call("Input.dispatchKeyEvent", Some(params)).await?;
        Ok(())
    }

    /// CDP modifier bitmask from modifier names.
    pub(crate) fn modifier_flags(modifiers: &[&str]) -> i32 {
        let mut flags = 0;
        for m in modifiers {
            match m.to_lowercase().as_str() {
                "alt" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "command" | "cmd" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_flags() {
        assert_eq!(PageSession::modifier_flags(&["control"]), 2);
        assert_eq!(PageSession::modifier_flags(&["ctrl", "shift"]), 10);
        assert_eq!(PageSession::modifier_flags(&["bogus"]), 0);
    }
}
