//! Gesture Classifier: thumb extended vs. retracted.
//!
//! The hand posture must agree with the motion for a stroke to count as a
//! strum: a closed fist drives a downstroke, a thumbs-up drives an upstroke.
//! Anything else is the player repositioning their hand.

use crate::config::CalibrationConfig;
use crate::landmark::LandmarkFrame;
use crate::Direction;

/// Shape signal of one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandShape {
    pub thumb_distance: f32,
    pub extended:       bool,
}

impl HandShape {
    /// Direction this posture asks for: extended ⇒ up, retracted ⇒ down.
    pub fn expected_direction(self) -> Direction {
        Direction::from_down(!self.extended)
    }

    /// True when the motion agrees with the posture.
    pub fn agrees_with(self, direction: Direction) -> bool {
        self.expected_direction() == direction
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeClassifier {
    noise_threshold: f32,
}

impl ShapeClassifier {
    pub fn new(noise_threshold: f32) -> Self {
        ShapeClassifier { noise_threshold }
    }

    /// Extended when the thumb gap strictly exceeds the noise threshold.
    pub fn classify(&self, frame: &LandmarkFrame) -> HandShape {
        let thumb_distance = frame.thumb_distance();
        HandShape {
            thumb_distance,
            extended: thumb_distance > self.noise_threshold,
        }
    }

    pub fn threshold(&self) -> f32 { self.noise_threshold }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.noise_threshold = threshold;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Calibrator — derive travel / shape threshold from the first frames
// ════════════════════════════════════════════════════════════════════════════

/// Result of a finished calibration run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// New base travel distance.
    pub base_distance:   f32,
    /// Mean thumb gap, when the config asks to adopt it as the threshold.
    pub shape_threshold: Option<f32>,
    /// Hand center of the last calibration frame, the motion baseline.
    pub rest_center_y:   f32,
}

#[derive(Clone, Debug)]
pub struct Calibrator {
    frames:         usize,
    span_factor:    f32,
    adopt_shape:    bool,
    seen:           usize,
    thumb_sum:      f32,
}

impl Calibrator {
    pub fn new(cfg: &CalibrationConfig) -> Self {
        Calibrator {
            frames:      cfg.frames.max(1),
            span_factor: cfg.span_factor,
            adopt_shape: cfg.adopt_shape_threshold,
            seen:        0,
            thumb_sum:   0.0,
        }
    }

    /// Absorb one frame; returns the calibration once enough were seen.
    pub fn absorb(&mut self, frame: &LandmarkFrame) -> Option<Calibration> {
        self.seen += 1;
        self.thumb_sum += frame.thumb_distance();
        if self.seen < self.frames {
            return None;
        }
        let mean_thumb = self.thumb_sum / self.seen as f32;
        Some(Calibration {
            base_distance:   self.span_factor * frame.palm_span(),
            shape_threshold: self.adopt_shape.then_some(mean_thumb),
            rest_center_y:   frame.center().y,
        })
    }

    pub fn remaining(&self) -> usize { self.frames.saturating_sub(self.seen) }
}
