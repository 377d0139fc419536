//! Progressive Playback Engine.
//!
//! One [`PlaybackSession`] at a time. A session starts the clip at offset
//! 0; after that every frame's hand position is turned into a progress
//! value in `[0, 1]` and the audible position is pushed forward to match,
//! so the share of the strum gesture completed is the share of the clip
//! played.
//!
//! Each session owns a monitor thread that opens the output stream,
//! blocks until told to stop, runs the fade-out and halts the device.
//! Replacing a session waits for the previous monitor to finish, so two
//! streams are never audible at once.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum_detect::Direction;
use tracing::{debug, warn};

use crate::sink::AudioSink;
use crate::store::{sample_name, SampleStore};
use crate::voice::Voice;
use crate::PlaybackError;

/// Extra wait beyond the nominal fade before the device is halted anyway.
const FADE_SLACK_MS: u64 = 50;
const FADE_POLL:     Duration = Duration::from_millis(5);

// ════════════════════════════════════════════════════════════════════════════
// PlaybackConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Directory holding `{chord}_{down|up}.wav`.
    pub samples_dir:         PathBuf,
    pub fade_out_ms:         u32,
    /// Strum speed (per frame) that plays at full gain.
    pub velocity_full_scale: f32,
    pub min_gain:            f32,
    /// `false` forces the null output.
    pub audio:               bool,
    /// Substring of the preferred output device name.
    pub device:              Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            samples_dir:         PathBuf::from("chord_sounds"),
            fade_out_ms:         60,
            velocity_full_scale: 0.08,
            min_gain:            0.35,
            audio:               true,
            device:              None,
        }
    }
}

impl PlaybackConfig {
    /// Gain for a strum of the given speed.
    pub fn gain_for(&self, velocity: f32) -> f32 {
        if !(self.velocity_full_scale > 0.0) {
            return 1.0;
        }
        (velocity.abs() / self.velocity_full_scale).clamp(self.min_gain.clamp(0.0, 1.0), 1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Progress
// ════════════════════════════════════════════════════════════════════════════

/// Result of [`PlaybackEngine::update_progress`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    /// No session is active.
    Idle,
    /// Session continues at this progress.
    Advanced(f32),
    /// Progress reached 1.0; the session was stopped.
    Completed,
    /// Progress went backwards (the hand reversed); the session was stopped.
    Reversed,
}

impl Progress {
    /// True when this update ended the session.
    pub fn ended(self) -> bool {
        matches!(self, Progress::Completed | Progress::Reversed)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackSession
// ════════════════════════════════════════════════════════════════════════════

/// The live clip of one successful strum.
pub struct PlaybackSession {
    name:      String,
    voice:     Arc<Voice>,
    direction: Direction,
    start_y:   f32,
    progress:  f32,
    stop_tx:   Sender<u32>,
    monitor:   JoinHandle<()>,
}

impl PlaybackSession {
    /// Ask the monitor to fade out and halt; returns its handle to join.
    fn retire(self, fade_ms: u32) -> JoinHandle<()> {
        debug!(sample = %self.name, progress = self.progress, fade_ms, "session stopping");
        let _ = self.stop_tx.send(fade_ms);
        self.monitor
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct PlaybackEngine {
    sink:           Arc<dyn AudioSink>,
    store:          Box<dyn SampleStore>,
    config:         PlaybackConfig,
    total_distance: Mutex<f32>,
    session:        Mutex<Option<PlaybackSession>>,
    retiring:       Mutex<Vec<JoinHandle<()>>>,
}

impl PlaybackEngine {
    pub fn new(sink: Arc<dyn AudioSink>, store: Box<dyn SampleStore>, config: PlaybackConfig) -> Self {
        PlaybackEngine {
            sink,
            store,
            config,
            total_distance: Mutex::new(strum_detect::TravelConfig::default().base_distance),
            session:        Mutex::new(None),
            retiring:       Mutex::new(Vec::new()),
        }
    }

    /// Start the clip for `chord` in `direction` from offset 0.
    ///
    /// Any previous session is stopped with a fade-out first and this call
    /// blocks until that stream has ceased. On error no session is active.
    pub fn start(
        &self,
        chord:     &str,
        direction: Direction,
        start_y:   f32,
        velocity:  f32,
    ) -> Result<(), PlaybackError> {
        let mut slot = self.session.lock();
        if let Some(old) = slot.take() {
            self.retiring.lock().push(old.retire(self.config.fade_out_ms));
        }
        self.join_retired();

        let waveform = self.store.resolve(chord, direction)?;
        let voice = Arc::new(Voice::new(waveform, self.config.gain_for(velocity)));

        let (opened_tx, opened_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel();
        let sink = self.sink.clone();
        let monitor_voice = voice.clone();
        let monitor = thread::Builder::new()
            .name("strum-playback".into())
            .spawn(move || run_monitor(sink, monitor_voice, opened_tx, stop_rx))
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        let opened = opened_rx.recv().unwrap_or(Err(PlaybackError::MonitorLost));
        if let Err(e) = opened {
            let _ = monitor.join();
            return Err(e);
        }

        let name = sample_name(chord, direction);
        debug!(sample = %name, gain = voice.gain(), start_y, "session started");
        *slot = Some(PlaybackSession {
            name,
            voice,
            direction,
            start_y,
            progress: 0.0,
            stop_tx,
            monitor,
        });
        Ok(())
    }

    /// Feed the current hand position of an in-flight strum.
    ///
    /// Progress that decreases, or reaches 1.0, stops the session.
    pub fn update_progress(&self, current_y: f32) -> Progress {
        let total = *self.total_distance.lock();
        let mut slot = self.session.lock();
        let Some(session) = slot.as_mut() else {
            return Progress::Idle;
        };

        let displacement = match session.direction {
            Direction::Down => current_y - session.start_y,
            Direction::Up   => session.start_y - current_y,
        };
        let progress = if total > 0.0 {
            (displacement / total).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let outcome = if progress < session.progress {
            Progress::Reversed
        } else if progress >= 1.0 {
            Progress::Completed
        } else {
            session.progress = progress;
            let frames = session.voice.waveform().frames() as f64;
            session.voice.seek_forward(progress as f64 * frames);
            return Progress::Advanced(progress);
        };

        if let Some(done) = slot.take() {
            self.retiring.lock().push(done.retire(self.config.fade_out_ms));
        }
        outcome
    }

    /// Stop the active session with a fade of `fade_ms`. No-op when idle.
    ///
    /// Returns without waiting for the fade; the next [`start`] waits.
    ///
    /// [`start`]: PlaybackEngine::start
    pub fn stop(&self, fade_ms: u32) {
        if let Some(session) = self.session.lock().take() {
            self.retiring.lock().push(session.retire(fade_ms));
        }
    }

    /// Stop with the configured fade.
    pub fn cancel(&self) {
        self.stop(self.config.fade_out_ms);
    }

    /// Stop everything and wait for every stream to be halted.
    pub fn shutdown(&self) {
        self.stop(0);
        self.join_retired();
    }

    fn join_retired(&self) {
        let handles: Vec<_> = self.retiring.lock().drain(..).collect();
        for h in handles {
            if h.join().is_err() {
                warn!("playback monitor panicked");
            }
        }
    }

    /// Displacement that traverses the whole clip; refreshed every frame.
    pub fn set_total_distance(&self, distance: f32) {
        *self.total_distance.lock() = distance;
    }

    pub fn total_distance(&self) -> f32 { *self.total_distance.lock() }

    pub fn is_active(&self) -> bool { self.session.lock().is_some() }

    /// Progress of the active session.
    pub fn progress(&self) -> Option<f32> {
        self.session.lock().as_ref().map(|s| s.progress)
    }

    pub fn config(&self) -> &PlaybackConfig { &self.config }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) { self.shutdown(); }
}

// ════════════════════════════════════════════════════════════════════════════
// run_monitor — one per session
// ════════════════════════════════════════════════════════════════════════════

fn run_monitor(
    sink:      Arc<dyn AudioSink>,
    voice:     Arc<Voice>,
    opened_tx: SyncSender<Result<(), PlaybackError>>,
    stop_rx:   Receiver<u32>,
) {
    let mut stream = match sink.open(voice.clone()) {
        Ok(s) => {
            let _ = opened_tx.send(Ok(()));
            s
        }
        Err(e) => {
            let _ = opened_tx.send(Err(e));
            return;
        }
    };

    // A dropped sender means the engine is gone: stop without a fade.
    let fade_ms = stop_rx.recv().unwrap_or(0);
    if !voice.is_finished() {
        voice.request_fade(fade_ms);
        let deadline = Instant::now() + Duration::from_millis(fade_ms as u64 + FADE_SLACK_MS);
        while !voice.is_finished() && Instant::now() < deadline {
            thread::sleep(FADE_POLL);
        }
    }
    voice.finish();
    stream.halt();
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
