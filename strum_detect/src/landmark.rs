//! Per-frame hand landmarks.
//!
//! Coordinates are normalised image coordinates: `x` and `y` in roughly
//! `[0, 1]`, with `y` growing downward, so a downstroke has positive
//! vertical velocity.

use serde::{Deserialize, Serialize};

use crate::DetectError;

/// A single 2-D keypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self { Point2 { x, y } }

    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Indices in the 21-point hand model
// ════════════════════════════════════════════════════════════════════════════

pub const HAND_LANDMARKS: usize = 21;
pub const THUMB_TIP:      usize = 4;
pub const INDEX_MCP:      usize = 5;
pub const MIDDLE_MCP:     usize = 9;
pub const RING_MCP:       usize = 13;
pub const PINKY_MCP:      usize = 17;

// ════════════════════════════════════════════════════════════════════════════
// LandmarkFrame
// ════════════════════════════════════════════════════════════════════════════

/// The handful of named points the detector needs from one tracked hand.
///
/// * center pair: middle and ring knuckles; their midpoint is the hand center
/// * shape pair: thumb tip and index knuckle; their vertical gap is the
///   thumb-extension signal
/// * size reference: the topmost and bottommost points of the whole hand
/// * palm span: index and pinky knuckles, used only by calibration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Seconds, monotonically increasing across frames.
    #[serde(rename = "t")]
    pub timestamp:     f64,
    pub middle_mcp:    Point2,
    pub ring_mcp:      Point2,
    pub thumb_tip:     Point2,
    pub index_mcp:     Point2,
    pub pinky_mcp:     Point2,
    pub top:           Point2,
    pub bottom:        Point2,
}

impl LandmarkFrame {
    /// Build a frame from the full 21-point hand model.
    pub fn from_hand_landmarks(timestamp: f64, points: &[Point2]) -> Result<Self, DetectError> {
        if points.len() < HAND_LANDMARKS {
            return Err(DetectError::LandmarkCount {
                expected: HAND_LANDMARKS,
                got:      points.len(),
            });
        }
        let points = &points[..HAND_LANDMARKS];

        let mut top    = points[0];
        let mut bottom = points[0];
        for p in points {
            if p.y < top.y    { top = *p; }
            if p.y > bottom.y { bottom = *p; }
        }

        Ok(LandmarkFrame {
            timestamp,
            middle_mcp: points[MIDDLE_MCP],
            ring_mcp:   points[RING_MCP],
            thumb_tip:  points[THUMB_TIP],
            index_mcp:  points[INDEX_MCP],
            pinky_mcp:  points[PINKY_MCP],
            top,
            bottom,
        })
    }

    /// Midpoint of the middle and ring knuckles.
    pub fn center(&self) -> Point2 {
        self.middle_mcp.midpoint(self.ring_mcp)
    }

    /// Vertical extent of the hand (bounding-box height).
    pub fn hand_height(&self) -> f32 {
        (self.bottom.y - self.top.y).abs()
    }

    /// Vertical gap between thumb tip and index knuckle.
    pub fn thumb_distance(&self) -> f32 {
        (self.thumb_tip.y - self.index_mcp.y).abs()
    }

    /// Vertical gap between index and pinky knuckles.
    pub fn palm_span(&self) -> f32 {
        (self.index_mcp.y - self.pinky_mcp.y).abs()
    }

    /// A synthetic frame with the hand centred at (`x`, `y`).
    ///
    /// `thumb_gap` is the thumb-tip-to-knuckle distance and `height` the
    /// overall hand height. Used by simulated samplers and tests.
    pub fn synthetic(timestamp: f64, x: f32, y: f32, thumb_gap: f32, height: f32) -> Self {
        let half = height / 2.0;
        let index_mcp = Point2::new(x - 0.03, y - 0.01);
        LandmarkFrame {
            timestamp,
            middle_mcp: Point2::new(x - 0.01, y),
            ring_mcp:   Point2::new(x + 0.01, y),
            thumb_tip:  Point2::new(index_mcp.x - 0.02, index_mcp.y - thumb_gap),
            index_mcp,
            pinky_mcp:  Point2::new(x + 0.04, y + height * 0.3),
            top:        Point2::new(x, y - half),
            bottom:     Point2::new(x, y + half),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hand(offset_y: f32) -> Vec<Point2> {
        (0..HAND_LANDMARKS)
            .map(|i| Point2::new(0.5, 0.3 + offset_y + i as f32 * 0.01))
            .collect()
    }

    #[test]
    fn center_is_knuckle_midpoint() {
        let f = LandmarkFrame::from_hand_landmarks(0.0, &hand(0.0)).unwrap();
        // landmarks 9 and 13 sit at 0.39 and 0.43
        assert_abs_diff_eq!(f.center().y, 0.41, epsilon = 1e-6);
    }

    #[test]
    fn hand_height_spans_all_points() {
        let f = LandmarkFrame::from_hand_landmarks(0.0, &hand(0.0)).unwrap();
        assert_abs_diff_eq!(f.hand_height(), 0.20, epsilon = 1e-6);
    }

    #[test]
    fn thumb_distance_uses_landmarks_4_and_5() {
        let f = LandmarkFrame::from_hand_landmarks(0.0, &hand(0.0)).unwrap();
        assert_abs_diff_eq!(f.thumb_distance(), 0.01, epsilon = 1e-6);
    }

    #[test]
    fn too_few_landmarks_rejected() {
        let err = LandmarkFrame::from_hand_landmarks(0.0, &hand(0.0)[..20]).unwrap_err();
        assert!(matches!(err, DetectError::LandmarkCount { expected: 21, got: 20 }));
    }

    #[test]
    fn synthetic_frame_geometry() {
        let f = LandmarkFrame::synthetic(1.0, 0.5, 0.4, 0.08, 0.25);
        assert_abs_diff_eq!(f.center().y, 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(f.thumb_distance(), 0.08, epsilon = 1e-6);
        assert_abs_diff_eq!(f.hand_height(), 0.25, epsilon = 1e-6);
    }
}
