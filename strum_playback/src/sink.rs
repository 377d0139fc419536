//! Audio output backends.
//!
//! A sink turns a [`Voice`] into sound. The engine opens and halts streams
//! on the session's monitor thread only, so a [`StreamHandle`] need not be
//! `Send` (cpal streams are not, on every platform).

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use crate::voice::Voice;
use crate::PlaybackError;

/// Anything that can stream a voice to an output.
pub trait AudioSink: Send + Sync {
    fn open(&self, voice: Arc<Voice>) -> Result<Box<dyn StreamHandle>, PlaybackError>;
}

/// A live output stream. Dropping it also stops the stream.
pub trait StreamHandle {
    fn halt(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// CpalSink — default output device
// ════════════════════════════════════════════════════════════════════════════

/// Streams to the host's default output device, or to the first device
/// whose name contains `device_hint`.
pub struct CpalSink {
    device_hint: Option<String>,
}

impl CpalSink {
    pub fn new(device_hint: Option<String>) -> Self {
        CpalSink { device_hint }
    }

    fn device(&self) -> Result<cpal::Device, PlaybackError> {
        let host = cpal::default_host();
        if let Some(hint) = &self.device_hint {
            let hint = hint.to_lowercase();
            let found = host
                .output_devices()
                .map_err(|e| PlaybackError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| n.to_lowercase().contains(&hint)).unwrap_or(false));
            if let Some(device) = found {
                return Ok(device);
            }
            warn!(hint = %hint, "no output device matches; using the default");
        }
        host.default_output_device()
            .ok_or_else(|| PlaybackError::Device("no output device".into()))
    }

    /// True when an output device exists and can take `f32` samples.
    pub fn probe(&self) -> bool {
        match self.device().and_then(|d| stream_config(&d)) {
            Ok(_) => true,
            Err(e) => {
                warn!(%e, "audio output unusable");
                false
            }
        }
    }
}

/// One output format a device offers: sample format, channels and the
/// supported sample-rate range.
type FormatRange = (cpal::SampleFormat, u16, u32, u32);

/// Channels and sample rate for an `f32` stream. The device default wins
/// when it is `f32`; otherwise the first `f32` range is used, at the
/// default rate when it fits.
fn pick_f32(
    default_format:   cpal::SampleFormat,
    default_channels: u16,
    default_rate:     u32,
    offered:          &[FormatRange],
) -> Option<(u16, u32)> {
    if default_format == cpal::SampleFormat::F32 {
        return Some((default_channels, default_rate));
    }
    let mut f32s = offered.iter().filter(|r| r.0 == cpal::SampleFormat::F32);
    let first = f32s.clone().next()?;
    match f32s.find(|r| (r.2..=r.3).contains(&default_rate)) {
        Some(r) => Some((r.1, default_rate)),
        None    => Some((first.1, default_rate.clamp(first.2, first.3))),
    }
}

fn stream_config(device: &cpal::Device) -> Result<cpal::StreamConfig, PlaybackError> {
    let default = device
        .default_output_config()
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    let offered: Vec<FormatRange> = device
        .supported_output_configs()
        .map(|ranges| {
            ranges
                .map(|r| (r.sample_format(), r.channels(), r.min_sample_rate().0, r.max_sample_rate().0))
                .collect()
        })
        .unwrap_or_default();

    let (channels, rate) = pick_f32(
        default.sample_format(),
        default.channels(),
        default.sample_rate().0,
        &offered,
    )
    .ok_or_else(|| {
        PlaybackError::Unsupported(format!("no f32 output format (default {:?})", default.sample_format()))
    })?;

    Ok(cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(rate),
        buffer_size: cpal::BufferSize::Default,
    })
}

impl AudioSink for CpalSink {
    fn open(&self, voice: Arc<Voice>) -> Result<Box<dyn StreamHandle>, PlaybackError> {
        let device = self.device()?;
        let config = stream_config(&device)?;
        let channels = config.channels as usize;
        let step = voice.waveform().sample_rate() as f64 / config.sample_rate.0 as f64;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    voice.render(data, channels, step);
                },
                |err| warn!(%err, "output stream error"),
                None,
            )
            .map_err(|e| PlaybackError::Device(e.to_string()))?;
        stream.play().map_err(|e| PlaybackError::Device(e.to_string()))?;

        Ok(Box::new(CpalStream { stream: Some(stream) }))
    }
}

struct CpalStream {
    stream: Option<cpal::Stream>,
}

impl StreamHandle for CpalStream {
    fn halt(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) { self.halt(); }
}

// ════════════════════════════════════════════════════════════════════════════
// NullSink — used when no device is available
// ════════════════════════════════════════════════════════════════════════════

/// Accepts every voice and renders nothing.
pub struct NullSink;

struct NullStream;

impl StreamHandle for NullStream {
    fn halt(&mut self) {}
}

impl AudioSink for NullSink {
    fn open(&self, _voice: Arc<Voice>) -> Result<Box<dyn StreamHandle>, PlaybackError> {
        Ok(Box::new(NullStream))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_output — pick a backend
// ════════════════════════════════════════════════════════════════════════════

/// The cpal sink if an output device exists, otherwise [`NullSink`] with a
/// warning.
pub fn open_output(enabled: bool, device_hint: Option<String>) -> Arc<dyn AudioSink> {
    if !enabled {
        info!("audio disabled, using null output");
        return Arc::new(NullSink);
    }
    let sink = CpalSink::new(device_hint);
    if sink.probe() {
        Arc::new(sink)
    } else {
        warn!("no usable audio output device, using null output");
        Arc::new(NullSink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Waveform;

    #[test]
    fn null_sink_always_opens() {
        let voice = Arc::new(Voice::new(Arc::new(Waveform::from_samples(vec![0.0; 4], 1, 100)), 1.0));
        let mut handle = NullSink.open(voice).unwrap();
        handle.halt();
        handle.halt();
    }

    #[test]
    fn f32_default_is_kept() {
        let offered = [(cpal::SampleFormat::I16, 2, 8_000, 96_000)];
        assert_eq!(pick_f32(cpal::SampleFormat::F32, 2, 48_000, &offered), Some((2, 48_000)));
    }

    #[test]
    fn integer_default_falls_back_to_an_f32_range() {
        let offered = [
            (cpal::SampleFormat::I16, 2, 8_000, 96_000),
            (cpal::SampleFormat::F32, 1, 8_000, 22_050),
            (cpal::SampleFormat::F32, 2, 44_100, 48_000),
        ];
        // a range that covers the default rate is preferred
        assert_eq!(pick_f32(cpal::SampleFormat::I16, 2, 48_000, &offered), Some((2, 48_000)));
        // otherwise the first f32 range, rate clamped into it
        assert_eq!(pick_f32(cpal::SampleFormat::I16, 2, 96_000, &offered[..2]), Some((1, 22_050)));
    }

    #[test]
    fn no_f32_format_is_unusable() {
        let offered = [(cpal::SampleFormat::I16, 2, 8_000, 96_000)];
        assert_eq!(pick_f32(cpal::SampleFormat::I16, 2, 48_000, &offered), None);
        assert_eq!(pick_f32(cpal::SampleFormat::U16, 2, 48_000, &[]), None);
    }

    #[test]
    fn disabled_output_is_null() {
        let sink = open_output(false, None);
        let voice = Arc::new(Voice::new(Arc::new(Waveform::from_samples(vec![0.0; 4], 1, 100)), 1.0));
        assert!(sink.open(voice).is_ok());
    }
}
