//! Signal trace replay
//!
//! Recorded classifier outputs can be run through the temporal trackers and
//! the aggregator without any model. Traces are NDJSON, one record per line:
//!
//! ```text
//! {"gaze":"left","blink":0.05}                  one face in a frame
//! {"faces":[{"gaze":"center","blink":97.1}]}    any number of faces
//! {"faces":[]}                                  no face detected
//! {"score":0.93}                                one audio window
//! ```

use crate::audio_windows::count_disfluencies;
use crate::classifiers::EyeObservation;
use crate::config::{AnalysisConfig, EyeTrackerConfig};
use crate::error::{AnalysisError, AnalysisResult};
use crate::eye_tracker::EyeStateTracker;
use crate::types::{EyeCounts, ScoreBreakdown};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classifier output for one video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRecord {
    Faces { faces: Vec<EyeObservation> },
    Single(EyeObservation),
}

impl FrameRecord {
    pub fn observations(&self) -> &[EyeObservation] {
        match self {
            FrameRecord::Faces { faces } => faces,
            FrameRecord::Single(obs) => std::slice::from_ref(obs),
        }
    }
}

/// Classifier output for one audio window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub score: f32,
}

/// Parse NDJSON records, skipping blank lines
pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> AnalysisResult<Vec<T>> {
    let mut records = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                return Err(AnalysisError::TraceParse(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(records)
}

/// Run a frame trace through a fresh eye-state tracker
pub fn replay_frames(ndjson: &str, config: &EyeTrackerConfig) -> AnalysisResult<EyeCounts> {
    let records: Vec<FrameRecord> = parse_ndjson(ndjson)?;
    let mut tracker = EyeStateTracker::new(config);
    for record in &records {
        let observations = record.observations();
        if observations.is_empty() {
            tracker.skip_frame();
        }
        for obs in observations {
            tracker.observe(obs);
        }
    }

    debug!(
        frames = records.len(),
        frames_without_face = tracker.frames_without_face(),
        "Frame trace replayed"
    );
    Ok(tracker.counts())
}

/// Count disfluency episodes in a window-score trace
pub fn replay_windows(ndjson: &str, threshold: f32) -> AnalysisResult<u32> {
    let records: Vec<WindowRecord> = parse_ndjson(ndjson)?;
    Ok(count_disfluencies(records.iter().map(|r| r.score), threshold))
}

/// Score a pair of recorded traces
pub fn score_trace(
    frames_ndjson: &str,
    windows_ndjson: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<ScoreBreakdown> {
    let disfluency_count = replay_windows(windows_ndjson, config.audio.disfluency_threshold)?;
    let eye = replay_frames(frames_ndjson, &config.eye)?;
    Ok(ScoreBreakdown::from_counts(disfluency_count, eye))
}
