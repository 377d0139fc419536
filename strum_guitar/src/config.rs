//! TOML configuration file.
//!
//! Every section and field is optional; missing values take their defaults.
//! A missing file is created with every default written out as a comment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_detect::DetectorConfig;
use strum_playback::PlaybackConfig;
use tracing::{info, warn};

use crate::AppError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source:   SourceConfig,
    pub chord:    ChordConfig,
    pub report:   ReportConfig,
    pub detect:   DetectorConfig,
    pub playback: PlaybackConfig,
}

/// Which landmark sampler feeds the frame loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Mouse-driven simulator window.
    #[default]
    Sim,
    /// Recorded JSON-lines session.
    Replay,
    /// LeapMotion controller (`leap` feature).
    Leap,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind:     SourceKind,
    /// File for [`SourceKind::Replay`].
    pub replay:   Option<PathBuf>,
    /// Pace replays by their timestamps instead of as fast as possible.
    pub realtime: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordConfig {
    /// Line-oriented chord stream (a configured serial tty, a pipe, a log).
    pub device: Option<PathBuf>,
    /// Chord to play when no device is configured.
    pub fixed:  Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub rate_hz: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig { enabled: true, rate_hz: 10.0 }
    }
}

impl AppConfig {
    /// Read `path`, or create it with commented defaults if it is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, AppError> {
        let config_err = |message: String| AppError::Config { path: path.to_path_buf(), message };

        if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
            let cfg: AppConfig = toml::from_str(&text).map_err(|e| config_err(e.to_string()))?;
            info!(path = %path.display(), "config loaded");
            return Ok(cfg);
        }

        let cfg = AppConfig::default();
        match toml::to_string_pretty(&cfg) {
            Ok(text) => {
                if let Err(e) = fs::write(path, commented(&text)) {
                    warn!(path = %path.display(), %e, "cannot write default config");
                } else {
                    info!(path = %path.display(), "wrote default config");
                }
            }
            Err(e) => warn!(%e, "cannot serialise default config"),
        }
        Ok(cfg)
    }
}

/// Comment out every key line, keeping table headers and blank lines.
///
/// `f32` fields come out of the serialiser widened to `f64`
/// (`0.019999999552965164`); they are written back in their short form.
fn commented(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
            out.push_str(line);
        } else {
            out.push_str("# ");
            out.push_str(&compact_float(line));
        }
        out.push('\n');
    }
    out
}

fn compact_float(line: &str) -> String {
    let Some((key, value)) = line.split_once('=') else {
        return line.to_string();
    };
    let value = value.trim();
    if !value.contains('.') || value.contains('"') {
        return line.to_string();
    }
    match value.parse::<f32>() {
        Ok(v) => {
            let mut short = format!("{v}");
            if !short.contains('.') && !short.contains('e') {
                short.push_str(".0");
            }
            format!("{} = {}", key.trim(), short)
        }
        Err(_) => line.to_string(),
    }
}
