//! Sample lookup: chord + direction → clip.
//!
//! Clips follow the naming convention `{chord}_{down|up}`; on disk that is
//! `{root}/{chord}_{down|up}.wav`.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use strum_detect::Direction;
use tracing::{debug, warn};

use crate::waveform::Waveform;
use crate::PlaybackError;

/// Name of the clip for `chord` strummed in `direction`.
pub fn sample_name(chord: &str, direction: Direction) -> String {
    format!("{}_{}", chord, direction.as_str())
}

pub trait SampleStore: Send + Sync {
    fn resolve(&self, chord: &str, direction: Direction) -> Result<Arc<Waveform>, PlaybackError>;
}

// ════════════════════════════════════════════════════════════════════════════
// DirSampleStore — WAV files in a directory, decoded once
// ════════════════════════════════════════════════════════════════════════════

/// Clips not seen by [`DirSampleStore::preload`] are decoded on first use,
/// which then happens on the caller's thread.
pub struct DirSampleStore {
    root:  PathBuf,
    cache: Mutex<HashMap<String, Arc<Waveform>>>,
}

impl DirSampleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSampleStore { root: root.into(), cache: Mutex::new(HashMap::new()) }
    }

    /// Decode every `{chord}_{down|up}.wav` in the directory into the
    /// cache. Unreadable files are logged and skipped. Returns the number of
    /// clips cached.
    pub fn preload(&self) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.root.display(), %e, "cannot list samples");
                return 0;
            }
        };

        let mut cache = self.cache.lock();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let is_clip = name.ends_with("_down") || name.ends_with("_up");
            if !is_clip || cache.contains_key(name) {
                continue;
            }
            match Waveform::open(&path) {
                Ok(waveform) => {
                    cache.insert(name.to_string(), Arc::new(waveform));
                }
                Err(e) => warn!(path = %path.display(), %e, "skipping sample"),
            }
        }
        cache.len()
    }
}

impl SampleStore for DirSampleStore {
    fn resolve(&self, chord: &str, direction: Direction) -> Result<Arc<Waveform>, PlaybackError> {
        let name = sample_name(chord, direction);
        // chord names come from an external device; keep them inside `root`
        if chord.is_empty() || chord.contains(['/', '\\']) || chord.contains("..") {
            return Err(PlaybackError::NotFound { name });
        }

        if let Some(hit) = self.cache.lock().get(&name) {
            return Ok(hit.clone());
        }

        let path = self.root.join(format!("{name}.wav"));
        if !path.is_file() {
            return Err(PlaybackError::NotFound { name });
        }
        let waveform = Arc::new(Waveform::open(&path)?);
        debug!(path = %path.display(), frames = waveform.frames(), "sample decoded");
        self.cache.lock().insert(name, waveform.clone());
        Ok(waveform)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MemorySampleStore
// ════════════════════════════════════════════════════════════════════════════

/// Clips registered in memory; handy for headless runs and tests.
#[derive(Default)]
pub struct MemorySampleStore {
    samples: HashMap<String, Arc<Waveform>>,
}

impl MemorySampleStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, chord: &str, direction: Direction, waveform: Waveform) {
        self.samples.insert(sample_name(chord, direction), Arc::new(waveform));
    }

    pub fn with(mut self, chord: &str, direction: Direction, waveform: Waveform) -> Self {
        self.insert(chord, direction, waveform);
        self
    }
}

impl SampleStore for MemorySampleStore {
    fn resolve(&self, chord: &str, direction: Direction) -> Result<Arc<Waveform>, PlaybackError> {
        let name = sample_name(chord, direction);
        self.samples
            .get(&name)
            .cloned()
            .ok_or(PlaybackError::NotFound { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir()
            .join(format!("strum_store_{}_{}_{}", std::process::id(), nanos, tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_clip(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..80 {
            w.write_sample((i * 100) as i16).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn naming_convention() {
        assert_eq!(sample_name("G", Direction::Down), "G_down");
        assert_eq!(sample_name("Am", Direction::Up), "Am_up");
    }

    #[test]
    fn resolves_and_caches_from_directory() {
        let dir = temp_dir("hit");
        write_clip(&dir.join("C_up.wav"));
        let store = DirSampleStore::new(&dir);

        let a = store.resolve("C", Direction::Up).unwrap();
        assert_eq!(a.frames(), 80);
        let b = store.resolve("C", Direction::Up).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn preload_decodes_clips_up_front() {
        let dir = temp_dir("preload");
        write_clip(&dir.join("C_up.wav"));
        write_clip(&dir.join("C_down.wav"));
        std::fs::write(dir.join("notes.txt"), "not audio").unwrap();
        std::fs::write(dir.join("broken_down.wav"), "not a wav").unwrap();
        let store = DirSampleStore::new(&dir);

        assert_eq!(store.preload(), 2);
        // served from the cache even once the file is gone
        std::fs::remove_file(dir.join("C_up.wav")).unwrap();
        assert_eq!(store.resolve("C", Direction::Up).unwrap().frames(), 80);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn preload_of_missing_directory_is_empty() {
        let store = DirSampleStore::new("/nonexistent/strum_samples");
        assert_eq!(store.preload(), 0);
    }

    #[test]
    fn missing_direction_is_not_found() {
        let dir = temp_dir("miss");
        write_clip(&dir.join("C_up.wav"));
        let store = DirSampleStore::new(&dir);
        let err = store.resolve("C", Direction::Down).unwrap_err();
        assert!(matches!(err, PlaybackError::NotFound { ref name } if name == "C_down"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_like_chords_rejected() {
        let store = DirSampleStore::new(std::env::temp_dir());
        assert!(store.resolve("../etc/passwd", Direction::Down).is_err());
        assert!(store.resolve("", Direction::Down).is_err());
    }

    #[test]
    fn memory_store_lookup() {
        let store = MemorySampleStore::new()
            .with("D", Direction::Down, Waveform::from_samples(vec![0.0; 10], 1, 100));
        assert!(store.resolve("D", Direction::Down).is_ok());
        assert!(store.resolve("D", Direction::Up).is_err());
    }
}
