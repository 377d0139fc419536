//! The per-frame pipeline: detector → chord lookup → playback.
//!
//! `StrumPipeline` owns one [`StrumDetector`], a chord source and the
//! [`PlaybackEngine`]. Every sample goes through [`StrumPipeline::handle`]
//! on the frame thread, strictly in order. Playback failures are logged
//! here and never stop the next frame from being classified.

use chord_source::ChordSource;
use strum_detect::{FrameAnalysis, LandmarkFrame, StrumDetector, StrumEvent, StrumOutcome};
use strum_playback::{PlaybackEngine, PlaybackError};
use tracing::{debug, info, warn};

use crate::report::DetectionReport;
use crate::sampler::Sample;

pub struct StrumPipeline {
    detector: StrumDetector,
    chords:   Box<dyn ChordSource>,
    engine:   PlaybackEngine,
}

impl StrumPipeline {
    pub fn new(detector: StrumDetector, chords: Box<dyn ChordSource>, engine: PlaybackEngine) -> Self {
        StrumPipeline { detector, chords, engine }
    }

    /// Process one sample. Returns the frame time and its report, or `None`
    /// once the source has closed.
    pub fn handle(&mut self, sample: &Sample) -> Option<(f64, DetectionReport)> {
        match sample {
            Sample::Hand(frame)          => Some((frame.timestamp, self.on_frame(frame))),
            Sample::NoHand { timestamp } => Some((*timestamp, self.on_no_hand())),
            Sample::Closed               => None,
        }
    }

    /// No hand: every piece of detector state is left as it is until the
    /// hand comes back. Live playback carries on.
    pub fn on_no_hand(&mut self) -> DetectionReport {
        DetectionReport::idle(self.chords.current_chord().as_deref())
    }

    pub fn on_frame(&mut self, frame: &LandmarkFrame) -> DetectionReport {
        let chords = &self.chords;
        let Some(analysis) = self.detector.process(frame, || chords.current_chord()) else {
            // baseline or calibration frame
            let mut report = DetectionReport::idle(self.chords.current_chord().as_deref());
            report.shape_extended = self.detector.classify(frame).extended;
            return report;
        };

        match &analysis.outcome {
            StrumOutcome::Strum(event) => self.play(event, &analysis),
            StrumOutcome::Reset => {
                if self.engine.is_active() {
                    debug!("reset cancels playback");
                }
                self.engine.cancel();
            }
            StrumOutcome::NoEvent { .. } => self.track(&analysis),
        }
        if !self.engine.is_active() {
            self.detector.end_playback();
        }

        let strum = analysis.outcome.strum();
        DetectionReport {
            chord: strum
                .and_then(|e| e.chord.clone())
                .or_else(|| self.chords.current_chord())
                .unwrap_or_else(|| chord_source::NO_CHORD.to_string()),
            strum_direction: strum.map(|e| e.direction),
            strum_detected:  strum.is_some(),
            velocity:        analysis.velocity,
            shape_extended:  analysis.shape.extended,
        }
    }

    fn play(&mut self, event: &StrumEvent, analysis: &FrameAnalysis) {
        let Some(chord) = event.chord.as_deref() else {
            info!(direction = %event.direction, "strum without a chord, nothing to play");
            self.engine.cancel();
            return;
        };
        self.engine.set_total_distance(analysis.total_distance);
        match self.engine.start(chord, event.direction, event.start_y, event.velocity) {
            Ok(()) => self.detector.begin_playback(),
            Err(PlaybackError::NotFound { name }) => {
                warn!(sample = %name, "no sample for this strum");
            }
            Err(e) => warn!(%e, "playback failed"),
        }
    }

    fn track(&mut self, analysis: &FrameAnalysis) {
        if !self.engine.is_active() {
            return;
        }
        self.engine.set_total_distance(analysis.total_distance);
        let progress = self.engine.update_progress(analysis.center_y);
        if progress.ended() {
            debug!(?progress, "strum playback ended");
        }
    }

    /// Stop playback and wait for the output to go quiet.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        self.detector.end_playback();
    }

    pub fn detector(&self) -> &StrumDetector { &self.detector }

    pub fn engine(&self) -> &PlaybackEngine { &self.engine }
}
