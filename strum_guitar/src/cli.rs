//! Command line flags; each one overrides its config-file counterpart.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{AppConfig, SourceKind};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Config file (created with commented defaults if missing)
    #[arg(long, default_value = "strum_guitar.toml")]
    pub config: PathBuf,

    /// Landmark source
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Replay a recorded JSON-lines session (implies `--source replay`)
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Pace the replay by its timestamps
    #[arg(long)]
    pub realtime: bool,

    /// Directory of `{chord}_{down|up}.wav` samples
    #[arg(long)]
    pub samples: Option<PathBuf>,

    /// Play this chord when no chord device is attached
    #[arg(long)]
    pub chord: Option<String>,

    /// Read chord names, one per line, from this file or device
    #[arg(long)]
    pub chord_device: Option<PathBuf>,

    /// Do not open an audio device
    #[arg(long)]
    pub no_audio: bool,

    /// Calibrate hand size from the first frames
    #[arg(long)]
    pub calibrate: bool,

    /// Do not print detection reports
    #[arg(long)]
    pub quiet_report: bool,
}

impl Args {
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(kind) = self.source {
            cfg.source.kind = kind;
        }
        if let Some(path) = &self.replay {
            cfg.source.kind = SourceKind::Replay;
            cfg.source.replay = Some(path.clone());
        }
        if self.realtime {
            cfg.source.realtime = true;
        }
        if let Some(dir) = &self.samples {
            cfg.playback.samples_dir = dir.clone();
        }
        if let Some(chord) = &self.chord {
            cfg.chord.fixed = Some(chord.clone());
        }
        if let Some(dev) = &self.chord_device {
            cfg.chord.device = Some(dev.clone());
        }
        if self.no_audio {
            cfg.playback.audio = false;
        }
        if self.calibrate {
            cfg.detect.calibration.enabled = true;
        }
        if self.quiet_report {
            cfg.report.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "strum_guitar",
            "--replay", "take.jsonl",
            "--chord", "Em",
            "--no-audio",
            "--calibrate",
            "--quiet-report",
        ])
        .unwrap();
        let mut cfg = AppConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.source.kind, SourceKind::Replay);
        assert_eq!(cfg.source.replay, Some(PathBuf::from("take.jsonl")));
        assert_eq!(cfg.chord.fixed.as_deref(), Some("Em"));
        assert!(!cfg.playback.audio);
        assert!(cfg.detect.calibration.enabled);
        assert!(!cfg.report.enabled);
    }

    #[test]
    fn no_flags_leave_config_alone() {
        let args = Args::try_parse_from(["strum_guitar"]).unwrap();
        assert_eq!(args.config, PathBuf::from("strum_guitar.toml"));
        let mut cfg = AppConfig::default();
        args.apply(&mut cfg);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn source_names() {
        let args = Args::try_parse_from(["strum_guitar", "--source", "leap"]).unwrap();
        assert_eq!(args.source, Some(SourceKind::Leap));
    }
}
