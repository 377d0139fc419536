//! `Voice`: the render state shared between the engine and the audio
//! callback.
//!
//! Positions are fractional clip frames stored as `f64` bits in atomics.
//! Non-negative `f64` values order the same way as their bit patterns, so
//! `fetch_max` on the bits moves a position forward only.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::waveform::Waveform;

pub struct Voice {
    waveform:   Arc<Waveform>,
    gain:       f32,
    position:   AtomicU64,
    fade_start: AtomicU64,
    /// Position at which the fade reaches silence; +∞ while no fade is set.
    fade_end:   AtomicU64,
    finished:   AtomicBool,
}

impl Voice {
    pub fn new(waveform: Arc<Waveform>, gain: f32) -> Self {
        Voice {
            waveform,
            gain:       gain.clamp(0.0, 1.0),
            position:   AtomicU64::new(0f64.to_bits()),
            fade_start: AtomicU64::new(0f64.to_bits()),
            fade_end:   AtomicU64::new(f64::INFINITY.to_bits()),
            finished:   AtomicBool::new(false),
        }
    }

    pub fn waveform(&self) -> &Waveform { &self.waveform }

    pub fn gain(&self) -> f32 { self.gain }

    /// Current play position in clip frames.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    /// Move the play position forward to `frame`; never moves it back.
    pub fn seek_forward(&self, frame: f64) {
        let frame = frame.max(0.0);
        self.position.fetch_max(frame.to_bits(), Ordering::AcqRel);
    }

    /// Ramp the gain to zero over the next `fade_ms` of clip time, then
    /// finish. A zero-length fade finishes at once.
    pub fn request_fade(&self, fade_ms: u32) {
        let frames = fade_ms as f64 * self.waveform.sample_rate() as f64 / 1000.0;
        if frames <= 0.0 {
            self.finish();
            return;
        }
        let start = self.position();
        let end   = (start + frames).min(self.waveform.frames() as f64);
        self.fade_start.store(start.to_bits(), Ordering::Release);
        self.fade_end.store(end.to_bits(), Ordering::Release);
    }

    pub fn is_fading(&self) -> bool {
        f64::from_bits(self.fade_end.load(Ordering::Acquire)).is_finite()
    }

    pub fn finish(&self) { self.finished.store(true, Ordering::Release); }

    pub fn is_finished(&self) -> bool { self.finished.load(Ordering::Acquire) }

    /// Fill an interleaved output buffer of `channels` channels.
    ///
    /// `step` is clip frames per output frame (clip rate / device rate).
    /// Called from the audio callback; never blocks.
    pub fn render(&self, out: &mut [f32], channels: usize, step: f64) {
        if channels == 0 {
            return;
        }
        if self.is_finished() {
            out.fill(0.0);
            return;
        }

        let total      = self.waveform.frames() as f64;
        let fade_end   = f64::from_bits(self.fade_end.load(Ordering::Acquire));
        let fade_start = f64::from_bits(self.fade_start.load(Ordering::Acquire));
        let fade_span  = (fade_end - fade_start).max(f64::EPSILON);

        let mut pos  = self.position();
        let mut done = false;
        for frame in out.chunks_mut(channels) {
            if pos >= total || pos >= fade_end {
                frame.fill(0.0);
                done = true;
                continue;
            }
            let mut g = self.gain;
            if fade_end.is_finite() {
                g *= ((fade_end - pos) / fade_span).clamp(0.0, 1.0) as f32;
            }
            for (ch, s) in frame.iter_mut().enumerate() {
                *s = self.waveform.sample_at(pos, ch) * g;
            }
            pos += step;
        }

        self.seek_forward(pos);
        if done {
            self.finish();
        }
    }
}
