//! # strum_detect
//!
//! Turns a noisy per-frame stream of 2-D hand landmarks into discrete strum
//! decisions.
//!
//! ## Pipeline
//!
//! | Stage | Type | Output |
//! |---|---|---|
//! | Motion Filter | [`MotionFilter`] | smoothed vertical velocity + [`Direction`] |
//! | Gesture Classifier | [`ShapeClassifier`] | thumb extended / retracted |
//! | Stability gate | [`GestureWindow`] | W consecutive identical directions |
//! | Strum State Machine | [`StrumMachine`] | [`StrumOutcome`] |
//!
//! [`StrumDetector`] wires the four together and is what an application
//! normally drives, one [`LandmarkFrame`] per captured frame.
//!
//! ## Quick start
//!
//! ```rust
//! use strum_detect::{DetectorConfig, StrumDetector, StrumOutcome};
//!
//! let mut detector = StrumDetector::new(DetectorConfig::default()).unwrap();
//! # let frames: Vec<strum_detect::LandmarkFrame> = Vec::new();
//! for frame in &frames {
//!     let Some(analysis) = detector.process(frame, || Some("G".to_string())) else {
//!         continue; // baseline / calibration frame
//!     };
//!     if let StrumOutcome::Strum(event) = &analysis.outcome {
//!         println!("{} strum on {:?}", event.direction, event.chord);
//!     }
//! }
//! ```
//!
//! No image processing happens here: landmarks come from an external
//! extractor, and everything in this crate can be exercised with synthetic
//! frames.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod detector;
pub mod landmark;
pub mod machine;
pub mod motion;
pub mod shape;
pub mod window;

pub use config::{CalibrationConfig, DetectorConfig, TravelConfig};
pub use detector::{FrameAnalysis, StrumDetector};
pub use landmark::{LandmarkFrame, Point2};
pub use machine::{Phase, StrumContext, StrumEvent, StrumInput, StrumMachine, StrumOutcome};
pub use motion::{MotionFilter, MotionSample, Travel};
pub use shape::{Calibration, Calibrator, HandShape, ShapeClassifier};
pub use window::GestureWindow;

// ════════════════════════════════════════════════════════════════════════════
// Direction
// ════════════════════════════════════════════════════════════════════════════

/// Vertical strum direction in image coordinates (y grows downward).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Classify a smoothed velocity. Exactly zero counts as `Down`.
    pub fn from_velocity(velocity: f32) -> Self {
        if velocity >= 0.0 { Direction::Down } else { Direction::Up }
    }

    pub fn from_down(down: bool) -> Self {
        if down { Direction::Down } else { Direction::Up }
    }

    pub fn is_down(self) -> bool { self == Direction::Down }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up   => Direction::Down,
        }
    }

    /// Lower-case name, as used in sample file names (`G_down.wav`).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up   => "up",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// A full-hand landmark set had the wrong number of points.
    #[error("expected {expected} hand landmarks, got {got}")]
    LandmarkCount { expected: usize, got: usize },

    /// A configuration value is out of range.
    #[error("invalid detector config: {0}")]
    Config(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_is_down() {
        assert_eq!(Direction::from_velocity(0.0), Direction::Down);
        assert_eq!(Direction::from_velocity(-0.001), Direction::Up);
    }

    #[test]
    fn flipped_round_trips() {
        assert_eq!(Direction::Down.flipped(), Direction::Up);
        assert_eq!(Direction::Up.flipped().flipped(), Direction::Up);
    }

    #[test]
    fn direction_serialises_lowercase() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.as_str(), "down");
    }
}
