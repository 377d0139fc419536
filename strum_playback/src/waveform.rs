//! Decoded PCM clips.

use std::path::Path;

use crate::PlaybackError;

/// An in-memory clip: interleaved `f32` samples in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples:     Vec<f32>,
    channels:    u16,
    sample_rate: u32,
}

impl Waveform {
    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Waveform { samples, channels: channels.max(1), sample_rate: sample_rate.max(1) }
    }

    /// Decode a WAV file (integer PCM of any width, or 32-bit float).
    pub fn open(path: &Path) -> Result<Self, PlaybackError> {
        let decode = |source| PlaybackError::Decode { path: path.to_path_buf(), source };

        let reader = hound::WavReader::open(path).map_err(decode)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode)?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(PlaybackError::Unsupported(format!(
                        "{} bits per sample in {}",
                        spec.bits_per_sample,
                        path.display()
                    )));
                }
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(decode)?
            }
        };

        Ok(Waveform::from_samples(samples, spec.channels, spec.sample_rate))
    }

    pub fn channels(&self) -> u16 { self.channels }

    pub fn sample_rate(&self) -> u32 { self.sample_rate }

    /// Number of sample frames (one sample per channel each).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample of `channel` at fractional frame `pos`, linearly interpolated.
    ///
    /// Channels beyond the clip's own wrap around, so a mono clip feeds
    /// every output channel.
    pub fn sample_at(&self, pos: f64, channel: usize) -> f32 {
        let frames = self.frames();
        if frames == 0 || pos < 0.0 {
            return 0.0;
        }
        let ch = channel % self.channels as usize;
        let i  = pos.floor() as usize;
        if i >= frames {
            return 0.0;
        }
        let frac = (pos - i as f64) as f32;
        let a = self.samples[i * self.channels as usize + ch];
        let b = if i + 1 < frames {
            self.samples[(i + 1) * self.channels as usize + ch]
        } else {
            0.0
        };
        a + (b - a) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("strum_playback_{}_{}_{}", std::process::id(), nanos, name))
    }

    #[test]
    fn decodes_16_bit_wav() {
        let path = unique_path("pcm16.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16_384, -16_384, i16::MAX] {
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();

        let wf = Waveform::open(&path).unwrap();
        assert_eq!(wf.frames(), 4);
        assert_eq!(wf.sample_rate(), 8_000);
        assert_abs_diff_eq!(wf.sample_at(1.0, 0), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(wf.sample_at(2.0, 0), -0.5, epsilon = 1e-4);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = Waveform::open(&unique_path("absent.wav")).unwrap_err();
        assert!(matches!(err, PlaybackError::Decode { .. }));
    }

    #[test]
    fn interpolates_between_frames() {
        let wf = Waveform::from_samples(vec![0.0, 1.0], 1, 100);
        assert_abs_diff_eq!(wf.sample_at(0.25, 0), 0.25, epsilon = 1e-6);
        assert_eq!(wf.sample_at(5.0, 0), 0.0);
    }

    #[test]
    fn mono_feeds_every_channel() {
        let wf = Waveform::from_samples(vec![0.3, 0.6], 1, 100);
        assert_eq!(wf.sample_at(1.0, 0), wf.sample_at(1.0, 1));
    }

    #[test]
    fn stereo_frames_and_duration() {
        let wf = Waveform::from_samples(vec![0.0; 400], 2, 100);
        assert_eq!(wf.frames(), 200);
        assert_abs_diff_eq!(wf.duration_secs(), 2.0, epsilon = 1e-9);
    }
}
