//! # strum_playback
//!
//! Plays prerecorded strum clips progressively: a clip starts when a strum
//! is accepted and its audible position then tracks how far the hand has
//! travelled, so a half-finished gesture has played half the clip.
//!
//! | Module       | Role                                                    |
//! |--------------|---------------------------------------------------------|
//! | [`waveform`] | decoded PCM clips (`hound`)                             |
//! | [`store`]    | `{chord}_{dir}` lookup, directory or in-memory          |
//! | [`voice`]    | lock-free render state shared with the audio callback   |
//! | [`sink`]     | output backends: `cpal` device or null                  |
//! | [`engine`]   | the single-session progressive playback engine          |

pub mod engine;
pub mod sink;
pub mod store;
pub mod voice;
pub mod waveform;

pub use engine::{PlaybackConfig, PlaybackEngine, PlaybackSession, Progress};
pub use sink::{open_output, AudioSink, CpalSink, NullSink, StreamHandle};
pub use store::{sample_name, DirSampleStore, MemorySampleStore, SampleStore};
pub use voice::Voice;
pub use waveform::Waveform;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// No clip exists for the requested chord and direction.
    #[error("sample not found: {name}")]
    NotFound { name: String },

    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path:   PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("audio device: {0}")]
    Device(String),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    /// The session's monitor thread exited before reporting.
    #[error("playback monitor exited unexpectedly")]
    MonitorLost,
}
