//! Clip geometry: pixel coordinates on the timeline canvas.
//!
//! All of this is derived per job and never persisted; the canvas is
//! re-measured after the clip lands on the timeline.

use serde::{Deserialize, Serialize};

/// A point in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Zero-area rectangles are how the editor "hides" overlays without
    /// removing them from the DOM.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Pixels the clip's right edge must travel to reach the target width.
///
/// Positive means the clip is too short and must be stretched before
/// splitting; non-positive means it already covers the target duration
/// and no drag happens at all.
pub fn drag_distance(current_width_px: f64, target_secs: f64, px_per_sec: f64) -> f64 {
    target_secs * px_per_sec - current_width_px
}

/// Per-job measurements of the timeline.
#[derive(Debug, Clone, Copy)]
pub struct ClipGeometry {
    /// Timeline canvas bounds.
    pub canvas: Rect,
    /// Vertical offset from the canvas top to the middle of the target
    /// track.
    pub track_offset: f64,
    /// Left edge of the clip after positioning.
    pub clip_left: f64,
}

impl ClipGeometry {
    /// Point on the target track at horizontal position `x`.
    pub fn track_point(&self, x: f64) -> Point {
        Point::new(x, self.canvas.y + self.track_offset)
    }

    /// Where to click to select the right-hand segment after a split:
    /// just inside the canvas right edge, on the track.
    pub fn right_segment_point(&self, inset: f64) -> Point {
        self.track_point(self.canvas.right() - inset)
    }

    /// Horizontal position of the playhead for a given media time.
    pub fn time_to_x(&self, secs: f64, px_per_sec: f64) -> f64 {
        self.clip_left + secs * px_per_sec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_distance_clip_longer_than_target() {
        // 45s of material at 30 px/s against a 30s target: no drag.
        let d = drag_distance(45.0 * 30.0, 30.0, 30.0);
        assert_eq!(d, -450.0);
        assert!(d <= 0.0);
    }

    #[test]
    fn test_drag_distance_clip_shorter_than_target() {
        let d = drag_distance(20.0 * 30.0, 30.0, 30.0);
        assert_eq!(d, 300.0);
    }

    #[test]
    fn test_rect_empty_and_center() {
        assert!(Rect::new(5.0, 5.0, 0.0, 10.0).is_empty());
        assert!(!Rect::new(5.0, 5.0, 2.0, 2.0).is_empty());
        let c = Rect::new(10.0, 20.0, 100.0, 50.0).center();
        assert_eq!(c, Point::new(60.0, 45.0));
    }

    #[test]
    fn test_geometry_points() {
        let geo = ClipGeometry {
            canvas: Rect::new(0.0, 400.0, 1200.0, 300.0),
            track_offset: 120.0,
            clip_left: 40.0,
        };
        assert_eq!(geo.track_point(100.0), Point::new(100.0, 520.0));
        assert_eq!(geo.right_segment_point(8.0), Point::new(1192.0, 520.0));
        assert_eq!(geo.time_to_x(30.0, 30.0), 940.0);
    }
}
