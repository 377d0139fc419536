//! Motion Filter: moving-average vertical velocity of the hand center.
//!
//! A simple moving average over the last K raw velocities is used instead of
//! exponential smoothing: its response lag is exactly K frames.

use std::collections::VecDeque;

use crate::config::TravelConfig;
use crate::landmark::LandmarkFrame;
use crate::Direction;

/// Output of one Motion Filter tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    pub center_y:  f32,
    /// Mean of the velocity history, in units per frame.
    pub velocity:  f32,
    pub direction: Direction,
}

/// Bounded history of hand-center positions and per-tick velocities.
#[derive(Clone, Debug)]
pub struct MotionFilter {
    capacity:   usize,
    /// Center of the previous frame; `None` until the first hand frame.
    baseline:   Option<f32>,
    positions:  VecDeque<f32>,
    velocities: VecDeque<f32>,
}

impl MotionFilter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MotionFilter {
            capacity,
            baseline:   None,
            positions:  VecDeque::with_capacity(capacity),
            velocities: VecDeque::with_capacity(capacity),
        }
    }

    /// Feed the center of one hand frame.
    ///
    /// The very first call only stores the baseline and returns `None`; the
    /// caller must skip gesture logic for that tick.
    pub fn update(&mut self, center_y: f32) -> Option<MotionSample> {
        push_bounded(&mut self.positions, center_y, self.capacity);

        let Some(prev) = self.baseline.replace(center_y) else {
            return None;
        };

        push_bounded(&mut self.velocities, center_y - prev, self.capacity);
        let velocity = self.smoothed_velocity().unwrap_or(0.0);

        Some(MotionSample {
            center_y,
            velocity,
            direction: Direction::from_velocity(velocity),
        })
    }

    pub fn observe(&mut self, frame: &LandmarkFrame) -> Option<MotionSample> {
        self.update(frame.center().y)
    }

    /// Arithmetic mean of the velocity history.
    pub fn smoothed_velocity(&self) -> Option<f32> {
        if self.velocities.is_empty() {
            return None;
        }
        Some(self.velocities.iter().sum::<f32>() / self.velocities.len() as f32)
    }

    pub fn baseline(&self) -> Option<f32> { self.baseline }

    pub fn set_baseline(&mut self, center_y: f32) {
        self.baseline = Some(center_y);
    }

    /// Move the baseline back to `anchor_y` and clear both histories; the
    /// position history restarts at the anchor.
    pub fn rebase(&mut self, anchor_y: f32) {
        self.baseline = Some(anchor_y);
        self.velocities.clear();
        self.positions.clear();
        self.positions.push_back(anchor_y);
    }

    /// Recent hand-center positions, oldest first.
    pub fn positions(&self) -> impl Iterator<Item = f32> + '_ {
        self.positions.iter().copied()
    }
}

fn push_bounded(buf: &mut VecDeque<f32>, value: f32, capacity: usize) {
    if buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(value);
}

// ════════════════════════════════════════════════════════════════════════════
// Travel — hand-size normalised strum distance
// ════════════════════════════════════════════════════════════════════════════

/// Full-traversal distance for scrub playback, scaled so that players at
/// different camera distances need comparable physical travel.
#[derive(Clone, Debug, PartialEq)]
pub struct Travel {
    base_distance:    f32,
    reference_height: f32,
    min_distance:     f32,
    max_distance:     f32,
}

impl Travel {
    pub fn new(cfg: &TravelConfig) -> Self {
        Travel {
            base_distance:    cfg.base_distance,
            reference_height: cfg.reference_height,
            min_distance:     cfg.min_distance,
            max_distance:     cfg.max_distance,
        }
    }

    /// `base × (reference / height)`, clamped to `[min, max]`.
    pub fn distance_for(&self, hand_height: f32) -> f32 {
        if !(hand_height > f32::EPSILON) {
            return self.max_distance;
        }
        (self.base_distance * (self.reference_height / hand_height))
            .clamp(self.min_distance, self.max_distance)
    }

    pub fn base_distance(&self) -> f32 { self.base_distance }

    pub fn set_base_distance(&mut self, base: f32) {
        self.base_distance = base;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_frame_only_sets_baseline() {
        let mut m = MotionFilter::new(5);
        assert!(m.update(0.4).is_none());
        assert_eq!(m.baseline(), Some(0.4));
        assert!(m.smoothed_velocity().is_none());
    }

    #[test]
    fn moving_average_over_history() {
        let mut m = MotionFilter::new(3);
        m.update(0.0);
        m.update(0.1);            // v = 0.1
        m.update(0.3);            // v = 0.2
        let s = m.update(0.6).unwrap(); // v = 0.3
        assert_abs_diff_eq!(s.velocity, 0.2, epsilon = 1e-6);
        assert_eq!(s.direction, Direction::Down);
    }

    #[test]
    fn oldest_velocity_is_evicted() {
        let mut m = MotionFilter::new(2);
        m.update(0.0);
        m.update(1.0);            // v = 1.0, evicted below
        m.update(1.1);            // v = 0.1
        let s = m.update(1.2).unwrap(); // v = 0.1
        assert_abs_diff_eq!(s.velocity, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn upward_motion_is_up() {
        let mut m = MotionFilter::new(5);
        m.update(0.5);
        let s = m.update(0.45).unwrap();
        assert_eq!(s.direction, Direction::Up);
        assert!(s.velocity < 0.0);
    }

    #[test]
    fn stationary_hand_reads_down() {
        let mut m = MotionFilter::new(5);
        m.update(0.5);
        let s = m.update(0.5).unwrap();
        assert_eq!(s.velocity, 0.0);
        assert_eq!(s.direction, Direction::Down);
    }

    #[test]
    fn rebase_clears_velocity_history() {
        let mut m = MotionFilter::new(5);
        m.update(0.1);
        m.update(0.2);
        m.rebase(0.15);
        assert!(m.smoothed_velocity().is_none());
        let s = m.update(0.16).unwrap();
        assert_abs_diff_eq!(s.velocity, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn position_history_is_bounded() {
        let mut m = MotionFilter::new(3);
        for y in [0.1, 0.2, 0.3, 0.4] {
            m.update(y);
        }
        let kept: Vec<f32> = m.positions().collect();
        assert_eq!(kept, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn rebase_restarts_position_history_at_anchor() {
        let mut m = MotionFilter::new(5);
        m.update(0.1);
        m.update(0.2);
        m.update(0.3);
        m.rebase(0.15);
        assert_eq!(m.positions().collect::<Vec<_>>(), vec![0.15]);
        m.update(0.16);
        assert_eq!(m.positions().collect::<Vec<_>>(), vec![0.15, 0.16]);
    }

    #[test]
    fn travel_scales_inversely_with_hand_height() {
        let t = Travel::new(&TravelConfig::default());
        assert_abs_diff_eq!(t.distance_for(0.25), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(t.distance_for(0.5), 0.15, epsilon = 1e-6);
    }

    #[test]
    fn travel_is_clamped() {
        let t = Travel::new(&TravelConfig::default());
        assert_abs_diff_eq!(t.distance_for(0.05), 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(t.distance_for(2.0), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(t.distance_for(0.0), 0.6, epsilon = 1e-6);
    }
}
