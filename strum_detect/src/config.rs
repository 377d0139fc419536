//! Detector thresholds and window sizes.

use serde::{Deserialize, Serialize};

use crate::DetectError;

/// All tunables of the detection pipeline.
///
/// Times are in seconds; distances and velocities in normalised image
/// units (per frame for velocities).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// K: capacity of the velocity history the moving average runs over.
    pub history_len:        usize,
    /// W: consecutive same-direction frames required before a strum.
    pub stability_frames:   usize,
    pub velocity_threshold: f32,
    /// Thumb gap above which the hand counts as "extended".
    pub shape_threshold:    f32,
    pub cooldown_secs:      f64,
    /// An open strum window older than this is abandoned.
    pub max_strum_secs:     f64,
    pub travel:             TravelConfig,
    pub calibration:        CalibrationConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            history_len:        10,
            stability_frames:   5,
            velocity_threshold: 0.02,
            shape_threshold:    0.05,
            cooldown_secs:      0.2,
            max_strum_secs:     4.0,
            travel:             TravelConfig::default(),
            calibration:        CalibrationConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.history_len == 0 {
            return Err(DetectError::Config("history_len must be at least 1".into()));
        }
        if self.stability_frames == 0 {
            return Err(DetectError::Config("stability_frames must be at least 1".into()));
        }
        if self.velocity_threshold < 0.0 || self.shape_threshold < 0.0 {
            return Err(DetectError::Config("thresholds must be non-negative".into()));
        }
        if self.cooldown_secs < 0.0 || self.max_strum_secs <= 0.0 {
            return Err(DetectError::Config(
                "cooldown_secs must be >= 0 and max_strum_secs > 0".into(),
            ));
        }
        self.travel.validate()?;
        if self.calibration.enabled && self.calibration.frames == 0 {
            return Err(DetectError::Config("calibration.frames must be at least 1".into()));
        }
        Ok(())
    }
}

/// Hand-size normalisation of the strum travel distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelConfig {
    /// Displacement that plays the whole clip for a hand of `reference_height`.
    pub base_distance:    f32,
    pub reference_height: f32,
    pub min_distance:     f32,
    pub max_distance:     f32,
}

impl Default for TravelConfig {
    fn default() -> Self {
        TravelConfig {
            base_distance:    0.3,
            reference_height: 0.25,
            min_distance:     0.1,
            max_distance:     0.6,
        }
    }
}

impl TravelConfig {
    fn validate(&self) -> Result<(), DetectError> {
        if self.base_distance <= 0.0 || self.reference_height <= 0.0 {
            return Err(DetectError::Config(
                "travel.base_distance and travel.reference_height must be positive".into(),
            ));
        }
        if self.min_distance <= 0.0 || self.min_distance > self.max_distance {
            return Err(DetectError::Config(
                "travel needs 0 < min_distance <= max_distance".into(),
            ));
        }
        Ok(())
    }
}

/// Start-up calibration from the first few hand frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub enabled:               bool,
    pub frames:                usize,
    /// Base travel = `span_factor` × palm span (index to pinky knuckle).
    pub span_factor:           f32,
    /// Replace `shape_threshold` by the mean thumb gap seen while calibrating.
    pub adopt_shape_threshold: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            enabled:               false,
            frames:                10,
            span_factor:           1.5,
            adopt_shape_threshold: false,
        }
    }
}
