//! # strum_guitar
//!
//! Air-guitar strumming. One tracked hand becomes a stream of down/up
//! strums; each accepted strum plays the current chord's sample, and the
//! sample is scrubbed along with the hand as the stroke continues.
//!
//! ## Hand → action mapping
//!
//! | Hand | Motion | Action |
//! |---|---|---|
//! | Closed fist (thumb in) | Down | Downstroke, plays `{chord}_down` |
//! | Thumb up (extended) | Up | Upstroke, plays `{chord}_up` |
//! | Closed fist | Up | Reset; stops playback, next strum may go either way |
//! | Thumb up | Down | Reset |
//! | Any | Reverses mid-stroke | Playback stops with a short fade |
//!
//! Strums must alternate; a second downstroke in a row is ignored until an
//! upstroke or a reset.
//!
//! ## Sources
//!
//! * `sim` (default): a window where the mouse is the hand; hold
//!   `Space` for thumb up, `Q` quits.
//! * `replay`: a recorded JSON-lines session.
//! * `leap`: a LeapMotion controller (build with `--features leap`).
//!
//! Detection reports go to stdout as JSON lines, at most `report.rate_hz`
//! per second.

pub mod app;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod sim;

use std::path::PathBuf;

/// Startup failures. Anything that goes wrong once frames are flowing is
/// logged and the loop carries on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("no frame source: {0}")]
    Source(String),

    #[error(transparent)]
    Detect(#[from] strum_detect::DetectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
