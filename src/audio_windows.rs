//! Sliding-window disfluency detection
//!
//! The audio track is cut into a fixed schedule of overlapping windows. Each
//! window is normalized, reduced to a 32 × 32 feature matrix and classified.
//! Runs of disfluent windows collapse into one event, counted when the run
//! ends.

use crate::classifiers::{AudioFeatureExtractor, DisfluencyClassifier};
use crate::config::AudioWindowConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::features::{normalize_amplitude, FeatureMatrix, FEATURE_COLS};
use crate::hysteresis::FallingEdgeCounter;
use crate::media::AudioTrack;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// One analysis window, `[start_ms, end_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioWindow {
    pub index: u32,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// The fixed window schedule: window `i` spans
/// `[i·stride, i·stride + window_ms)`, independent of track length
pub fn window_schedule(config: &AudioWindowConfig) -> impl Iterator<Item = AudioWindow> {
    let stride = config.stride_ms as u64;
    let length = config.window_ms as u64;
    (0..config.window_count).map(move |index| {
        let start_ms = index as u64 * stride;
        AudioWindow {
            index,
            start_ms,
            end_ms: start_ms + length,
        }
    })
}

/// Count completed disfluency episodes in a sequence of window scores
pub fn count_disfluencies<I>(scores: I, threshold: f32) -> u32
where
    I: IntoIterator<Item = f32>,
{
    let mut counter = FallingEdgeCounter::new();
    for score in scores {
        counter.observe(score >= threshold);
    }
    counter.events()
}

/// Feature matrix of one window plus how the raw output was shaped
#[derive(Debug, Clone)]
pub struct WindowFeatures {
    pub window: AudioWindow,
    pub matrix: FeatureMatrix,
    /// Columns the extractor produced before padding or truncation
    pub raw_columns: usize,
}

impl WindowFeatures {
    pub fn was_padded(&self) -> bool {
        self.raw_columns < FEATURE_COLS
    }

    pub fn was_truncated(&self) -> bool {
        self.raw_columns > FEATURE_COLS
    }
}

/// Classifies audio windows for disfluency and counts episodes
pub struct AudioWindowClassifier<'a> {
    extractor: &'a dyn AudioFeatureExtractor,
    classifier: &'a dyn DisfluencyClassifier,
    config: &'a AudioWindowConfig,
}

impl<'a> AudioWindowClassifier<'a> {
    pub fn new(
        extractor: &'a dyn AudioFeatureExtractor,
        classifier: &'a dyn DisfluencyClassifier,
        config: &'a AudioWindowConfig,
    ) -> Self {
        Self {
            extractor,
            classifier,
            config,
        }
    }

    /// Run the whole window schedule over `track` and return the number of
    /// completed disfluency episodes
    pub fn process(&self, track: &AudioTrack) -> AnalysisResult<u32> {
        let track = track.resampled(self.config.sample_rate);
        let mut counter = FallingEdgeCounter::new();
        let mut active_windows = 0u32;

        for window in window_schedule(self.config) {
            let features = window_features(self.extractor, &track, window)?;
            let score = self.classifier.classify(&features.matrix)?;
            if score.is_nan() {
                return Err(AnalysisError::Classifier(format!(
                    "disfluency model returned NaN for window {}",
                    window.index
                )));
            }

            let active = score >= self.config.disfluency_threshold;
            if active {
                active_windows += 1;
            }
            if counter.observe(active) {
                trace!(window = window.index, "Disfluency episode ended");
            }
        }

        debug!(
            windows = self.config.window_count,
            active_windows,
            track_ms = track.duration_ms(),
            disfluency_count = counter.events(),
            "Audio window analysis complete"
        );

        Ok(counter.events())
    }
}

/// Extract the shaped feature matrix for one window of `track`
pub fn window_features(
    extractor: &dyn AudioFeatureExtractor,
    track: &AudioTrack,
    window: AudioWindow,
) -> AnalysisResult<WindowFeatures> {
    let samples = normalize_amplitude(track.slice_ms(window.start_ms, window.end_ms));
    let raw = extractor.extract(&samples, track.sample_rate())?;
    let raw_columns = raw.ncols();
    let matrix = FeatureMatrix::fit(raw)?;
    Ok(WindowFeatures {
        window,
        matrix,
        raw_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MfccExtractor;
    use ndarray::Array2;
    use std::sync::Mutex;

    /// Replays a fixed score per window, in order
    struct ScriptedClassifier {
        scores: Mutex<std::vec::IntoIter<f32>>,
    }

    impl ScriptedClassifier {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores: Mutex::new(scores.into_iter()),
            }
        }
    }

    impl DisfluencyClassifier for ScriptedClassifier {
        fn classify(&self, features: &FeatureMatrix) -> AnalysisResult<f32> {
            assert_eq!(features.values().dim(), (32, 32));
            Ok(self.scores.lock().unwrap().next().unwrap_or(0.0))
        }
    }

    /// Returns a fixed number of columns regardless of input
    struct FixedWidthExtractor(usize);

    impl AudioFeatureExtractor for FixedWidthExtractor {
        fn extract(&self, _samples: &[f32], _rate: u32) -> AnalysisResult<Array2<f32>> {
            Ok(Array2::ones((32, self.0)))
        }
    }

    struct FailingClassifier;

    impl DisfluencyClassifier for FailingClassifier {
        fn classify(&self, _features: &FeatureMatrix) -> AnalysisResult<f32> {
            Err(AnalysisError::Classifier("inference failed".into()))
        }
    }

    fn activity(pattern: &[(bool, usize)]) -> Vec<f32> {
        pattern
            .iter()
            .flat_map(|&(active, n)| std::iter::repeat(if active { 0.95 } else { 0.1 }).take(n))
            .collect()
    }

    #[test]
    fn test_schedule_geometry() {
        let config = AudioWindowConfig::default();
        let windows: Vec<AudioWindow> = window_schedule(&config).collect();

        assert_eq!(windows.len(), 300);
        assert_eq!(windows[0].start_ms, 0);
        assert_eq!(windows[0].end_ms, 1000);
        assert_eq!(windows[1].start_ms, 100);
        assert_eq!(windows[299].start_ms, 29_900);
        assert_eq!(windows[299].end_ms, 30_900);
    }

    #[test]
    fn test_debounce_counts_completed_runs() {
        let scores = activity(&[(true, 3), (false, 1), (true, 5), (false, 2)]);
        assert_eq!(count_disfluencies(scores, 0.9), 2);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(count_disfluencies(vec![0.9, 0.0], 0.9), 1);
        assert_eq!(count_disfluencies(vec![0.899, 0.0], 0.9), 0);
    }

    #[test]
    fn test_trailing_active_run_is_not_counted() {
        let scores = activity(&[(false, 2), (true, 4)]);
        assert_eq!(count_disfluencies(scores, 0.9), 0);
    }

    #[test]
    fn test_process_over_schedule() {
        let config = AudioWindowConfig::default();
        let mut scores = activity(&[(true, 3), (false, 1), (true, 5), (false, 2)]);
        scores.resize(300, 0.0);

        let extractor = FixedWidthExtractor(32);
        let classifier = ScriptedClassifier::new(scores);
        let audio = AudioWindowClassifier::new(&extractor, &classifier, &config);

        let track = AudioTrack::silence(5_000, 8000);
        assert_eq!(audio.process(&track).unwrap(), 2);
    }

    #[test]
    fn test_short_track_still_runs_every_window() {
        let config = AudioWindowConfig::default();
        let extractor = MfccExtractor::default();
        let classifier = ScriptedClassifier::new(Vec::new());
        let audio = AudioWindowClassifier::new(&extractor, &classifier, &config);

        // 2 s of audio against a 30.9 s schedule
        let track = AudioTrack::silence(2_000, 8000);
        assert_eq!(audio.process(&track).unwrap(), 0);
        assert_eq!(classifier.scores.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_window_past_track_end_is_zero_matrix() {
        let extractor = MfccExtractor::default();
        let track = AudioTrack::silence(1_000, 8000);
        let window = AudioWindow {
            index: 50,
            start_ms: 5_000,
            end_ms: 6_000,
        };

        let features = window_features(&extractor, &track, window).unwrap();
        assert_eq!(features.raw_columns, 0);
        assert!(features.was_padded());
        assert!(features.matrix.is_zero());
    }

    #[test]
    fn test_wide_extractor_output_is_truncated() {
        let extractor = FixedWidthExtractor(40);
        let track = AudioTrack::silence(1_000, 8000);
        let window = window_schedule(&AudioWindowConfig::default()).next().unwrap();

        let features = window_features(&extractor, &track, window).unwrap();
        assert!(features.was_truncated());
        assert_eq!(features.matrix.values().dim(), (32, 32));
    }

    #[test]
    fn test_classifier_failure_aborts() {
        let config = AudioWindowConfig::default();
        let extractor = FixedWidthExtractor(32);
        let audio = AudioWindowClassifier::new(&extractor, &FailingClassifier, &config);

        let err = audio.process(&AudioTrack::silence(1_000, 8000)).unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(_)));
    }

    #[test]
    fn test_track_is_resampled_to_config_rate() {
        struct RateCheck;
        impl AudioFeatureExtractor for RateCheck {
            fn extract(&self, _samples: &[f32], rate: u32) -> AnalysisResult<Array2<f32>> {
                assert_eq!(rate, 8000);
                Ok(Array2::zeros((32, 0)))
            }
        }

        let config = AudioWindowConfig {
            window_count: 3,
            ..AudioWindowConfig::default()
        };
        let classifier = ScriptedClassifier::new(Vec::new());
        let audio = AudioWindowClassifier::new(&RateCheck, &classifier, &config);
        assert_eq!(audio.process(&AudioTrack::silence(1_000, 16_000)).unwrap(), 0);
    }
}
