//! Top-level application: wires the collaborators together and runs the
//! frame loop until the source closes.

use std::io::{self, Write};

use chord_source::{ChordReader, ChordSource, FixedChord};
use strum_detect::StrumDetector;
use strum_playback::{open_output, DirSampleStore, PlaybackEngine};
use tracing::{info, warn};

use crate::config::{AppConfig, ChordConfig, SourceConfig, SourceKind};
use crate::pipeline::StrumPipeline;
use crate::report::ReportThrottle;
use crate::sampler::{spawn_sampler, Feed, ReplaySource};
use crate::sim::SimSource;
use crate::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Collaborators
// ════════════════════════════════════════════════════════════════════════════

/// Open the configured landmark source. Failing here is fatal.
pub fn open_feed(cfg: &SourceConfig) -> Result<Feed, AppError> {
    match cfg.kind {
        SourceKind::Sim => Ok(Feed::Inline(Box::new(SimSource::new()?))),
        SourceKind::Replay => {
            let path = cfg
                .replay
                .as_deref()
                .ok_or_else(|| AppError::Source("replay source needs a file".into()))?;
            let replay = ReplaySource::open(path, cfg.realtime)?;
            info!(path = %path.display(), realtime = cfg.realtime, "replaying");
            Ok(Feed::Threaded(spawn_sampler(replay)))
        }
        #[cfg(feature = "leap")]
        SourceKind::Leap => Ok(Feed::Inline(Box::new(crate::sampler::LeapSource::open()?))),
        #[cfg(not(feature = "leap"))]
        SourceKind::Leap => Err(AppError::Source(
            "built without LeapMotion support (rebuild with --features leap)".into(),
        )),
    }
}

/// The chord device if one is configured and opens, else the fixed chord.
pub fn open_chords(cfg: &ChordConfig) -> Box<dyn ChordSource> {
    if let Some(device) = &cfg.device {
        let mut reader = ChordReader::new();
        match reader.open_path(device) {
            Ok(()) => return Box::new(reader),
            Err(e) => warn!(%e, "chord device unavailable"),
        }
    }
    match &cfg.fixed {
        Some(chord) => {
            info!(chord = %chord, "playing a fixed chord");
            Box::new(FixedChord::new(chord))
        }
        None => {
            warn!("no chord source; strums will not play");
            Box::new(FixedChord::none())
        }
    }
}

pub fn build_pipeline(cfg: &AppConfig) -> Result<StrumPipeline, AppError> {
    let detector = StrumDetector::new(cfg.detect.clone())?;
    let chords = open_chords(&cfg.chord);

    let store = DirSampleStore::new(&cfg.playback.samples_dir);
    if cfg.playback.samples_dir.is_dir() {
        // decode now so the first strum of each clip does not stall the frame loop
        let clips = store.preload();
        info!(dir = %cfg.playback.samples_dir.display(), clips, "samples loaded");
    } else {
        warn!(dir = %cfg.playback.samples_dir.display(), "samples directory not found");
    }
    let sink = open_output(cfg.playback.audio, cfg.playback.device.clone());
    let engine = PlaybackEngine::new(sink, Box::new(store), cfg.playback.clone());

    Ok(StrumPipeline::new(detector, chords, engine))
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run until the source closes (window closed, replay finished, `Q`).
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let mut pipeline = build_pipeline(&cfg)?;
    let mut feed = open_feed(&cfg.source)?;
    let mut throttle = ReportThrottle::new(cfg.report.rate_hz);
    let stdout = io::stdout();

    let mut reporting = cfg.report.enabled;
    let mut frames = 0u64;
    loop {
        let sample = feed.next();
        let Some((t, report)) = pipeline.handle(&sample) else {
            break;
        };
        frames += 1;

        if !reporting {
            continue;
        }
        if let Some(report) = throttle.offer(t, report) {
            let line = serde_json::to_string(&report).map_err(io::Error::from)?;
            let mut out = stdout.lock();
            if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
                // reader went away; keep playing without reports
                warn!("report stream closed");
                reporting = false;
            }
        }
    }

    pipeline.shutdown();
    info!(frames, "source closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn replay_without_file_is_a_startup_error() {
        let cfg = SourceConfig { kind: SourceKind::Replay, replay: None, realtime: false };
        assert!(matches!(open_feed(&cfg), Err(AppError::Source(_))));
    }

    #[test]
    fn missing_replay_file_is_a_startup_error() {
        let cfg = SourceConfig {
            kind:     SourceKind::Replay,
            replay:   Some(PathBuf::from("/nonexistent/take.jsonl")),
            realtime: false,
        };
        assert!(matches!(open_feed(&cfg), Err(AppError::Source(_))));
    }

    #[test]
    fn chord_falls_back_to_fixed() {
        let cfg = ChordConfig {
            device: Some(PathBuf::from("/nonexistent/tty")),
            fixed:  Some("A".into()),
        };
        assert_eq!(open_chords(&cfg).current_chord().as_deref(), Some("A"));
        assert_eq!(open_chords(&ChordConfig::default()).current_chord(), None);
    }

    #[test]
    fn invalid_detector_config_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detect.stability_frames = 0;
        cfg.playback.audio = false;
        assert!(matches!(build_pipeline(&cfg), Err(AppError::Detect(_))));
    }

    #[test]
    fn replay_runs_to_completion_headless() {
        let path = std::env::temp_dir().join(format!(
            "strum_guitar_app_{}_{}.jsonl",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut text = String::new();
        for i in 0..12 {
            let f = strum_detect::LandmarkFrame::synthetic(i as f64 / 30.0, 0.5, 0.3 + 0.03 * i as f32, 0.01, 0.25);
            text.push_str(&serde_json::to_string(&f).unwrap());
            text.push('\n');
        }
        text.push_str("{\"t\": 0.5, \"hand\": null}\n");
        std::fs::write(&path, text).unwrap();

        let mut cfg = AppConfig::default();
        cfg.source.kind = SourceKind::Replay;
        cfg.source.replay = Some(path.clone());
        cfg.playback.audio = false;
        cfg.report.enabled = false;
        assert!(run(cfg).is_ok());
        let _ = std::fs::remove_file(&path);
    }
}
