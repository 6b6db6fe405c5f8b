//! Analysis configuration
//!
//! Thresholds and window geometry used by the temporal trackers. Defaults
//! reproduce the production scoring service; a JSON file may override any
//! subset of fields.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Consecutive off-center frames that make one gaze-aversion event
pub const DEFAULT_GAZE_FRAMES: u32 = 30;

/// Consecutive closed-eye frames that make one blink event
pub const DEFAULT_BLINK_FRAMES: u32 = 6;

/// Blink score (0-100 scale) below which the eye counts as closed
pub const DEFAULT_BLINK_THRESHOLD: f32 = 0.1;

/// Horizontal margin applied to the eye landmark bounding box
pub const DEFAULT_CROP_WIDTH_SCALE: f32 = 1.2;

/// Number of audio windows analyzed per track
pub const DEFAULT_WINDOW_COUNT: u32 = 300;

/// Audio window length in milliseconds
pub const DEFAULT_WINDOW_MS: u32 = 1000;

/// Offset between consecutive window starts in milliseconds
pub const DEFAULT_STRIDE_MS: u32 = 100;

/// Sample rate the audio track is resampled to before windowing
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

/// Classifier output at or above which a window is disfluent
pub const DEFAULT_DISFLUENCY_THRESHOLD: f32 = 0.9;

/// Eye-state tracker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeTrackerConfig {
    pub gaze_frames: u32,
    pub blink_frames: u32,
    pub blink_threshold: f32,
    pub crop_width_scale: f32,
    /// Mirror each frame horizontally before landmark detection
    pub mirror_frames: bool,
}

impl Default for EyeTrackerConfig {
    fn default() -> Self {
        Self {
            gaze_frames: DEFAULT_GAZE_FRAMES,
            blink_frames: DEFAULT_BLINK_FRAMES,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            crop_width_scale: DEFAULT_CROP_WIDTH_SCALE,
            mirror_frames: true,
        }
    }
}

/// Audio window classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioWindowConfig {
    pub window_count: u32,
    pub window_ms: u32,
    pub stride_ms: u32,
    pub sample_rate: u32,
    pub disfluency_threshold: f32,
}

impl Default for AudioWindowConfig {
    fn default() -> Self {
        Self {
            window_count: DEFAULT_WINDOW_COUNT,
            window_ms: DEFAULT_WINDOW_MS,
            stride_ms: DEFAULT_STRIDE_MS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            disfluency_threshold: DEFAULT_DISFLUENCY_THRESHOLD,
        }
    }
}

/// Complete configuration for one analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub eye: EyeTrackerConfig,
    pub audio: AudioWindowConfig,
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the trackers cannot run with
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.eye.gaze_frames == 0 {
            return Err(AnalysisError::Config("eye.gaze_frames must be > 0".into()));
        }
        if self.eye.blink_frames == 0 {
            return Err(AnalysisError::Config("eye.blink_frames must be > 0".into()));
        }
        if !(self.eye.blink_threshold > 0.0) {
            return Err(AnalysisError::Config(
                "eye.blink_threshold must be positive".into(),
            ));
        }
        if !(self.eye.crop_width_scale > 0.0) {
            return Err(AnalysisError::Config(
                "eye.crop_width_scale must be positive".into(),
            ));
        }
        if self.audio.window_ms == 0 {
            return Err(AnalysisError::Config("audio.window_ms must be > 0".into()));
        }
        if self.audio.stride_ms == 0 {
            return Err(AnalysisError::Config("audio.stride_ms must be > 0".into()));
        }
        if self.audio.sample_rate == 0 {
            return Err(AnalysisError::Config("audio.sample_rate must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.audio.disfluency_threshold) {
            return Err(AnalysisError::Config(
                "audio.disfluency_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.eye.gaze_frames, 30);
        assert_eq!(config.eye.blink_frames, 6);
        assert_eq!(config.audio.window_count, 300);
        assert_eq!(config.audio.window_ms, 1000);
        assert_eq!(config.audio.stride_ms, 100);
        assert_eq!(config.audio.sample_rate, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AnalysisConfig::from_json(r#"{"eye": {"gaze_frames": 15}}"#).unwrap();
        assert_eq!(config.eye.gaze_frames, 15);
        assert_eq!(config.eye.blink_frames, 6);
        assert_eq!(config.audio, AudioWindowConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = AnalysisConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        let err = AnalysisConfig::from_json(r#"{"eye": {"blink_frames": 0}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));

        let err = AnalysisConfig::from_json(r#"{"audio": {"disfluency_threshold": 1.5}}"#)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));

        let err = AnalysisConfig::from_json(r#"{"audio": {"stride_ms": 0}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));

        for threshold in ["0", "-0.5"] {
            let json = format!(r#"{{"eye": {{"blink_threshold": {threshold}}}}}"#);
            let err = AnalysisConfig::from_json(&json).unwrap_err();
            assert!(matches!(err, AnalysisError::Config(_)));
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            AnalysisConfig::from_json("not json"),
            Err(AnalysisError::JsonError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engage.json");
        std::fs::write(&path, r#"{"audio": {"window_count": 10}}"#).unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.audio.window_count, 10);

        let missing = AnalysisConfig::from_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(AnalysisError::Io(_))));
    }
}
