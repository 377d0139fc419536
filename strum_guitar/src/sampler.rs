//! Landmark samplers: where hand frames come from.
//!
//! Every source answers [`LandmarkSampler::next_sample`] once per capture
//! tick with a hand, "no hand", or the end of input. Sources that are
//! `Send` can run on their own capture thread via [`spawn_sampler`]; window
//! and device sources are polled inline on the frame thread.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use strum_detect::{DetectError, LandmarkFrame, Point2};
use tracing::{debug, warn};

use crate::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Sample
// ════════════════════════════════════════════════════════════════════════════

/// One capture tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    Hand(LandmarkFrame),
    /// No hand visible at `timestamp`.
    NoHand { timestamp: f64 },
    /// The source is exhausted or was closed.
    Closed,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSampler trait — unified interface for replay, sim and hardware
// ════════════════════════════════════════════════════════════════════════════

pub trait LandmarkSampler {
    fn next_sample(&mut self) -> Sample;
}

/// Run a sampler on its own thread and return the receiving end.
///
/// The thread ends after forwarding [`Sample::Closed`] or when the
/// receiver is dropped.
pub fn spawn_sampler<S>(mut sampler: S) -> Receiver<Sample>
where
    S: LandmarkSampler + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || loop {
        let sample = sampler.next_sample();
        let closed = sample == Sample::Closed;
        if tx.send(sample).is_err() || closed {
            return;
        }
    });
    rx
}

/// The frame loop's view of a sampler, wherever it runs.
pub enum Feed {
    Threaded(Receiver<Sample>),
    Inline(Box<dyn LandmarkSampler>),
}

impl Feed {
    /// Block for the next sample. A vanished capture thread reads as
    /// [`Sample::Closed`].
    pub fn next(&mut self) -> Sample {
        match self {
            Feed::Threaded(rx) => rx.recv().unwrap_or(Sample::Closed),
            Feed::Inline(s)    => s.next_sample(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource — recorded JSON lines
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("malformed replay line: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Landmarks(#[from] DetectError),
}

#[derive(Deserialize)]
struct HandLandmarks {
    t:         f64,
    landmarks: Vec<[f32; 2]>,
}

#[derive(Deserialize)]
struct Stamp {
    t: f64,
}

/// Parse one replay line. Blank lines and `#` comments yield `None`.
///
/// Accepted shapes:
/// * `{"t": 0.5, "landmarks": [[x, y], …]}`: the 21-point hand model
/// * `{"t": 0.5, "hand": null}`: no hand visible
/// * a serialised [`LandmarkFrame`] with its named points
pub fn parse_line(line: &str) -> Result<Option<Sample>, ReplayError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(line)?;

    if value.get("landmarks").is_some() {
        let hand: HandLandmarks = serde_json::from_value(value)?;
        let points: Vec<Point2> = hand.landmarks.iter().map(|&[x, y]| Point2::new(x, y)).collect();
        let frame = LandmarkFrame::from_hand_landmarks(hand.t, &points)?;
        return Ok(Some(Sample::Hand(frame)));
    }
    if value.get("hand").is_some_and(|h| h.is_null()) {
        let stamp: Stamp = serde_json::from_value(value)?;
        return Ok(Some(Sample::NoHand { timestamp: stamp.t }));
    }
    let frame: LandmarkFrame = serde_json::from_value(value)?;
    Ok(Some(Sample::Hand(frame)))
}

fn sample_time(sample: &Sample) -> Option<f64> {
    match sample {
        Sample::Hand(f)              => Some(f.timestamp),
        Sample::NoHand { timestamp } => Some(*timestamp),
        Sample::Closed               => None,
    }
}

/// Replays a recorded session, optionally paced by its timestamps.
pub struct ReplaySource<R> {
    lines:    Lines<R>,
    line_no:  usize,
    realtime: bool,
    /// Wall clock and recording time of the first sample.
    origin:   Option<(Instant, f64)>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path, realtime: bool) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::Source(format!("{}: {e}", path.display())))?;
        Ok(ReplaySource::new(BufReader::new(file), realtime))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, realtime: bool) -> Self {
        ReplaySource { lines: reader.lines(), line_no: 0, realtime, origin: None }
    }

    fn pace(&mut self, t: f64) {
        let (start, t0) = *self.origin.get_or_insert((Instant::now(), t));
        let due = start + Duration::from_secs_f64((t - t0).max(0.0));
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
    }
}

impl<R: BufRead> LandmarkSampler for ReplaySource<R> {
    fn next_sample(&mut self) -> Sample {
        loop {
            let line = match self.lines.next() {
                Some(Ok(l)) => l,
                Some(Err(e)) => {
                    warn!(%e, "replay read error");
                    return Sample::Closed;
                }
                None => {
                    debug!(lines = self.line_no, "replay finished");
                    return Sample::Closed;
                }
            };
            self.line_no += 1;
            match parse_line(&line) {
                Ok(Some(sample)) => {
                    if self.realtime {
                        if let Some(t) = sample_time(&sample) {
                            self.pace(t);
                        }
                    }
                    return sample;
                }
                Ok(None) => continue,
                Err(e) => warn!(line = self.line_no, %e, "skipping replay line"),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Sampler backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// The first tracked hand is mapped into normalised image coordinates over
/// a 400 mm wide, 400 mm tall interaction box (`y` grows downward).
#[cfg(feature = "leap")]
pub struct LeapSource {
    connection: leaprs::Connection,
    started:    Instant,
}

#[cfg(feature = "leap")]
impl LeapSource {
    const BOX_HALF_WIDTH: f32 = 200.0; // mm either side of the device
    const BOX_FLOOR:      f32 = 50.0;  // mm above the device
    const BOX_HEIGHT:     f32 = 400.0;

    pub fn open() -> Result<Self, AppError> {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| AppError::Source(format!("LeapC connection: {e:?}")))?;
        connection
            .open()
            .map_err(|e| AppError::Source(format!("LeapMotion device: {e:?}")))?;
        Ok(LeapSource { connection, started: Instant::now() })
    }

    fn normalise(x: f32, y: f32) -> Point2 {
        Point2::new(
            (x + Self::BOX_HALF_WIDTH) / (2.0 * Self::BOX_HALF_WIDTH),
            1.0 - (y - Self::BOX_FLOOR) / Self::BOX_HEIGHT,
        )
    }

    fn frame_from(hand: &leaprs::Hand, timestamp: f64) -> Option<LandmarkFrame> {
        let digits: Vec<_> = hand.digits().collect();
        if digits.len() < 5 {
            return None;
        }
        let knuckle = |i: usize| {
            let j = digits[i].proximal().prev_joint();
            Self::normalise(j.x, j.y)
        };
        let tip = digits[0].distal().next_joint();

        let mut top    = Point2::new(0.0, f32::INFINITY);
        let mut bottom = Point2::new(0.0, f32::NEG_INFINITY);
        for d in &digits {
            for j in [d.metacarpal().prev_joint(), d.distal().next_joint()] {
                let p = Self::normalise(j.x, j.y);
                if p.y < top.y    { top = p; }
                if p.y > bottom.y { bottom = p; }
            }
        }

        Some(LandmarkFrame {
            timestamp,
            middle_mcp: knuckle(2),
            ring_mcp:   knuckle(3),
            thumb_tip:  Self::normalise(tip.x, tip.y),
            index_mcp:  knuckle(1),
            pinky_mcp:  knuckle(4),
            top,
            bottom,
        })
    }
}

#[cfg(feature = "leap")]
impl LandmarkSampler for LeapSource {
    fn next_sample(&mut self) -> Sample {
        use leaprs::Event;

        loop {
            let msg = match self.connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let timestamp = self.started.elapsed().as_secs_f64();
                let hands: Vec<_> = frame.hands().collect();
                return match hands.first().and_then(|h| Self::frame_from(h, timestamp)) {
                    Some(f) => Sample::Hand(f),
                    None    => Sample::NoHand { timestamp },
                };
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hand_line(t: f64, y: f32) -> String {
        let pts: Vec<[f32; 2]> = (0..21).map(|i| [0.5, y + i as f32 * 0.01]).collect();
        serde_json::json!({ "t": t, "landmarks": pts }).to_string()
    }

    #[test]
    fn parses_21_point_line() {
        let s = parse_line(&hand_line(0.25, 0.3)).unwrap().unwrap();
        let Sample::Hand(f) = s else { panic!("expected a hand") };
        assert_eq!(f.timestamp, 0.25);
        // bounding box spans landmarks 0..=20
        assert!((f.hand_height() - 0.20).abs() < 1e-5);
    }

    #[test]
    fn parses_no_hand_line() {
        let s = parse_line(r#"{"t": 1.5, "hand": null}"#).unwrap().unwrap();
        assert_eq!(s, Sample::NoHand { timestamp: 1.5 });
    }

    #[test]
    fn parses_named_frame_line() {
        let frame = LandmarkFrame::synthetic(2.0, 0.5, 0.4, 0.01, 0.25);
        let line = serde_json::to_string(&frame).unwrap();
        assert_eq!(parse_line(&line).unwrap(), Some(Sample::Hand(frame)));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("  # recorded 2024").unwrap().is_none());
    }

    #[test]
    fn short_landmark_list_is_rejected() {
        let line = r#"{"t": 0.0, "landmarks": [[0.1, 0.2]]}"#;
        assert!(matches!(parse_line(line), Err(ReplayError::Landmarks(_))));
    }

    #[test]
    fn replay_skips_bad_lines_and_closes() {
        let text = format!("{}\nnot json\n{{\"t\":0.1,\"hand\":null}}\n", hand_line(0.0, 0.3));
        let mut src = ReplaySource::new(Cursor::new(text), false);
        assert!(matches!(src.next_sample(), Sample::Hand(_)));
        assert_eq!(src.next_sample(), Sample::NoHand { timestamp: 0.1 });
        assert_eq!(src.next_sample(), Sample::Closed);
    }

    #[test]
    fn realtime_replay_waits_for_timestamps() {
        let text = "{\"t\":0.0,\"hand\":null}\n{\"t\":0.05,\"hand\":null}\n";
        let mut src = ReplaySource::new(Cursor::new(text), true);
        let t0 = Instant::now();
        src.next_sample();
        src.next_sample();
        assert!(t0.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn threaded_feed_ends_with_closed() {
        let text = "{\"t\":0.0,\"hand\":null}\n";
        let rx = spawn_sampler(ReplaySource::new(Cursor::new(text), false));
        let mut feed = Feed::Threaded(rx);
        assert_eq!(feed.next(), Sample::NoHand { timestamp: 0.0 });
        assert_eq!(feed.next(), Sample::Closed);
        // capture thread has gone; the feed stays closed
        assert_eq!(feed.next(), Sample::Closed);
    }
}
