//! `StrumDetector`: Motion Filter, Gesture Classifier and Strum State
//! Machine wired together for one tracked hand.

use tracing::info;

use crate::config::DetectorConfig;
use crate::landmark::LandmarkFrame;
use crate::machine::{Phase, StrumContext, StrumInput, StrumMachine, StrumOutcome};
use crate::motion::{MotionFilter, Travel};
use crate::shape::{Calibrator, HandShape, ShapeClassifier};
use crate::{DetectError, Direction};

/// Everything the detector derived from one hand frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAnalysis {
    pub timestamp:      f64,
    pub center_y:       f32,
    /// Smoothed signed velocity.
    pub velocity:       f32,
    pub direction:      Direction,
    pub shape:          HandShape,
    /// Hand-size normalised displacement that plays a full clip.
    pub total_distance: f32,
    pub outcome:        StrumOutcome,
}

#[derive(Clone, Debug)]
pub struct StrumDetector {
    motion:     MotionFilter,
    shape:      ShapeClassifier,
    travel:     Travel,
    machine:    StrumMachine,
    calibrator: Option<Calibrator>,
}

impl StrumDetector {
    pub fn new(cfg: DetectorConfig) -> Result<Self, DetectError> {
        cfg.validate()?;
        Ok(StrumDetector {
            motion:     MotionFilter::new(cfg.history_len),
            shape:      ShapeClassifier::new(cfg.shape_threshold),
            travel:     Travel::new(&cfg.travel),
            machine:    StrumMachine::new(&cfg),
            calibrator: cfg.calibration.enabled.then(|| Calibrator::new(&cfg.calibration)),
        })
    }

    /// Process one hand frame.
    ///
    /// Returns `None` for frames that only establish state: calibration
    /// frames and the first frame after start-up, which sets the motion
    /// baseline. `chord` is consulted only if a strum is accepted.
    pub fn process<F>(&mut self, frame: &LandmarkFrame, chord: F) -> Option<FrameAnalysis>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(cal) = self.calibrator.as_mut() {
            let done = cal.absorb(frame)?;
            self.travel.set_base_distance(done.base_distance);
            if let Some(threshold) = done.shape_threshold {
                self.shape.set_threshold(threshold);
            }
            self.motion.set_baseline(done.rest_center_y);
            self.calibrator = None;
            info!(
                base_distance   = done.base_distance,
                shape_threshold = self.shape.threshold(),
                "calibration complete"
            );
            return None;
        }

        let total_distance = self.travel.distance_for(frame.hand_height());
        let sample = self.motion.observe(frame)?;
        let shape  = self.shape.classify(frame);

        let input = StrumInput {
            direction:   sample.direction,
            velocity:    sample.velocity,
            shape_valid: shape.agrees_with(sample.direction),
            center_y:    sample.center_y,
            now:         frame.timestamp,
        };
        let outcome = self.machine.step(&input, chord);

        if matches!(outcome, StrumOutcome::NoEvent { abandoned: true }) {
            if let Some(anchor) = self.machine.context().anchor_y {
                self.motion.rebase(anchor);
            }
        }

        Some(FrameAnalysis {
            timestamp: frame.timestamp,
            center_y: sample.center_y,
            velocity: sample.velocity,
            direction: sample.direction,
            shape,
            total_distance,
            outcome,
        })
    }

    /// Shape signal of a frame without advancing any state.
    pub fn classify(&self, frame: &LandmarkFrame) -> HandShape {
        self.shape.classify(frame)
    }

    pub fn begin_playback(&mut self) { self.machine.begin_playback(); }

    pub fn end_playback(&mut self) { self.machine.end_playback(); }

    pub fn phase(&self) -> Phase { self.machine.phase() }

    pub fn context(&self) -> &StrumContext { self.machine.context() }

    pub fn is_calibrating(&self) -> bool { self.calibrator.is_some() }

    pub fn motion(&self) -> &MotionFilter { &self.motion }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use approx::assert_abs_diff_eq;

    const FIST:      f32 = 0.01;
    const THUMBS_UP: f32 = 0.09;

    fn detector() -> StrumDetector {
        StrumDetector::new(DetectorConfig { history_len: 5, ..DetectorConfig::default() }).unwrap()
    }

    /// A hand moving `step` per frame from `y0`, 33 ms apart.
    fn stroke(t0: f64, y0: f32, step: f32, n: usize, thumb: f32) -> Vec<LandmarkFrame> {
        (0..n)
            .map(|i| {
                LandmarkFrame::synthetic(t0 + i as f64 * 0.033, 0.5, y0 + step * i as f32, thumb, 0.25)
            })
            .collect()
    }

    fn run(d: &mut StrumDetector, frames: &[LandmarkFrame]) -> Vec<Option<FrameAnalysis>> {
        frames.iter().map(|f| d.process(f, || Some("C".into()))).collect()
    }

    #[test]
    fn first_frame_sets_baseline_only() {
        let mut d = detector();
        let f = LandmarkFrame::synthetic(0.0, 0.5, 0.3, FIST, 0.25);
        assert!(d.process(&f, || None).is_none());
        assert_abs_diff_eq!(d.motion().baseline().unwrap(), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn fist_downstroke_strums() {
        let mut d = detector();
        let out = run(&mut d, &stroke(1.0, 0.2, 0.03, 6, FIST));
        assert!(out[0].is_none());
        for a in out[1..5].iter().flatten() {
            assert!(matches!(a.outcome, StrumOutcome::NoEvent { .. }));
        }
        let last = out[5].as_ref().unwrap();
        let ev = last.outcome.strum().expect("strum");
        assert_eq!(ev.direction, Direction::Down);
        assert_eq!(ev.chord.as_deref(), Some("C"));
        assert_abs_diff_eq!(ev.velocity, 0.03, epsilon = 1e-5);
        assert_eq!(d.context().expected, Direction::Up);
    }

    #[test]
    fn thumbs_up_downstroke_is_reset() {
        let mut d = detector();
        let out = run(&mut d, &stroke(1.0, 0.2, 0.03, 6, THUMBS_UP));
        assert_eq!(out[5].as_ref().unwrap().outcome, StrumOutcome::Reset);
        assert_eq!(d.context().last_success, None);
    }

    #[test]
    fn down_then_up_strum_pair() {
        let mut d = detector();
        let mut frames = stroke(1.0, 0.2, 0.03, 6, FIST);
        // the hand turns around at the bottom and comes back up with the thumb out
        frames.extend(stroke(1.5, 0.35, -0.04, 12, THUMBS_UP));
        let dirs: Vec<Direction> = run(&mut d, &frames)
            .into_iter()
            .flatten()
            .filter_map(|a| a.outcome.strum().map(|e| e.direction))
            .collect();
        assert_eq!(dirs, vec![Direction::Down, Direction::Up]);
    }

    #[test]
    fn total_distance_follows_hand_size() {
        let mut d = detector();
        d.process(&LandmarkFrame::synthetic(0.0, 0.5, 0.3, FIST, 0.5), || None);
        let a = d.process(&LandmarkFrame::synthetic(0.03, 0.5, 0.3, FIST, 0.5), || None).unwrap();
        assert_abs_diff_eq!(a.total_distance, 0.15, epsilon = 1e-6);
    }

    #[test]
    fn calibration_consumes_frames_then_rebases() {
        let cfg = DetectorConfig {
            calibration: CalibrationConfig { enabled: true, frames: 3, ..CalibrationConfig::default() },
            ..DetectorConfig::default()
        };
        let mut d = StrumDetector::new(cfg).unwrap();
        let frames = stroke(0.0, 0.4, 0.0, 4, FIST);
        assert!(d.process(&frames[0], || None).is_none());
        assert!(d.process(&frames[1], || None).is_none());
        assert!(d.is_calibrating());
        assert!(d.process(&frames[2], || None).is_none());
        assert!(!d.is_calibrating());
        // baseline came from calibration, so the next frame already yields motion
        let a = d.process(&frames[3], || None).unwrap();
        assert_abs_diff_eq!(a.velocity, 0.0, epsilon = 1e-6);
        let span = frames[2].palm_span();
        assert_abs_diff_eq!(
            a.total_distance,
            (1.5 * span).clamp(0.1, 0.6),
            epsilon = 1e-6
        );
    }

    #[test]
    fn timeout_rebases_motion_to_anchor() {
        let mut d = detector();
        let frames = stroke(1.0, 0.2, 0.03, 6, FIST);
        run(&mut d, &frames);
        let anchor = d.context().anchor_y.unwrap();

        let late = LandmarkFrame::synthetic(6.0, 0.5, 0.8, FIST, 0.25);
        let a = d.process(&late, || None).unwrap();
        assert_eq!(a.outcome, StrumOutcome::NoEvent { abandoned: true });
        assert_abs_diff_eq!(d.motion().baseline().unwrap(), anchor, epsilon = 1e-6);
        assert!(d.motion().smoothed_velocity().is_none());
        assert_eq!(d.motion().positions().collect::<Vec<_>>(), vec![anchor]);
    }
}
