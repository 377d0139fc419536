//! Per-frame detection reports and their rate limiter.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum_detect::Direction;

/// What a UI or telemetry consumer sees for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Current chord, `"None"` when unknown.
    pub chord:           String,
    /// Set only on the frame a strum was accepted.
    pub strum_direction: Option<Direction>,
    pub strum_detected:  bool,
    pub velocity:        f32,
    pub shape_extended:  bool,
}

impl DetectionReport {
    /// Report for a frame with nothing to say beyond the chord.
    pub fn idle(chord: Option<&str>) -> Self {
        DetectionReport {
            chord:           chord.unwrap_or(chord_source::NO_CHORD).to_string(),
            strum_direction: None,
            strum_detected:  false,
            velocity:        0.0,
            shape_extended:  false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReportThrottle
// ════════════════════════════════════════════════════════════════════════════

/// Passes at most `rate_hz` reports per second of frame time.
///
/// Strums seen between two emitted reports are queued and merged into the
/// following reports one per report, oldest first, so a consumer polling at
/// the throttled rate never misses one.
pub struct ReportThrottle {
    interval:  f64,
    last_emit: Option<f64>,
    latched:   VecDeque<Direction>,
}

impl ReportThrottle {
    /// `rate_hz <= 0` disables throttling.
    pub fn new(rate_hz: f64) -> Self {
        let interval = if rate_hz > 0.0 { 1.0 / rate_hz } else { 0.0 };
        ReportThrottle { interval, last_emit: None, latched: VecDeque::new() }
    }

    pub fn offer(&mut self, now: f64, mut report: DetectionReport) -> Option<DetectionReport> {
        if let Some(direction) = report.strum_direction.filter(|_| report.strum_detected) {
            self.latched.push_back(direction);
        }
        let due = self.last_emit.map_or(true, |last| now - last >= self.interval - 1e-9);
        if !due {
            return None;
        }
        self.last_emit = Some(now);
        match self.latched.pop_front() {
            Some(direction) => {
                report.strum_detected  = true;
                report.strum_direction = Some(direction);
            }
            None => {
                report.strum_detected  = false;
                report.strum_direction = None;
            }
        }
        Some(report)
    }
}
