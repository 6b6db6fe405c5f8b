//! Pipeline orchestration
//!
//! This module provides the public API for scoring one interview recording.
//! It drives the audio track through the window classifier, the video frames
//! through the eye-state tracker, and hands both counts to the aggregator.

use crate::audio_windows::AudioWindowClassifier;
use crate::classifiers::{
    AudioFeatureExtractor, BlinkClassifier, DisfluencyClassifier, EyeClassifierAdapter,
    FaceLandmarkDetector, GazeClassifier,
};
use crate::config::AnalysisConfig;
use crate::context::AnalysisContext;
use crate::error::AnalysisResult;
use crate::eye_tracker::EyeStateTracker;
use crate::features::MfccExtractor;
use crate::media::{AudioTrack, FrameDirectoryDecoder, FrameSource, MediaDecoder};
use crate::types::{EyeCounts, ScoreBreakdown};
use std::path::Path;
use tracing::{info, info_span, warn};

/// The trained models an analyzer runs
pub struct Models {
    pub detector: Box<dyn FaceLandmarkDetector>,
    pub gaze: Box<dyn GazeClassifier>,
    pub blink: Box<dyn BlinkClassifier>,
    pub disfluency: Box<dyn DisfluencyClassifier>,
}

/// Scores interview recordings.
///
/// The analyzer holds no per-run state: every call to [`analyze`] builds its
/// own counters, so one analyzer may score any number of recordings.
///
/// [`analyze`]: InterviewAnalyzer::analyze
pub struct InterviewAnalyzer {
    config: AnalysisConfig,
    models: Models,
    decoder: Box<dyn MediaDecoder>,
    extractor: Box<dyn AudioFeatureExtractor>,
}

impl InterviewAnalyzer {
    /// Create an analyzer with default settings, reading demuxed media
    /// directories and extracting MFCC features
    pub fn new(models: Models) -> Self {
        Self {
            config: AnalysisConfig::default(),
            models,
            decoder: Box::new(FrameDirectoryDecoder),
            extractor: Box::new(MfccExtractor::default()),
        }
    }

    /// Create an analyzer with a specific configuration
    pub fn with_config(models: Models, config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(models)
        })
    }

    /// Replace the media decoder
    pub fn with_decoder(mut self, decoder: Box<dyn MediaDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the audio feature extractor
    pub fn with_feature_extractor(mut self, extractor: Box<dyn AudioFeatureExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Score the recording at `media`.
    ///
    /// Audio runs to completion before video decoding starts. Any failure
    /// fails the whole run; there are no partial results.
    pub fn analyze(&self, ctx: &AnalysisContext, media: &Path) -> AnalysisResult<ScoreBreakdown> {
        let span = info_span!("analyze", request_id = %ctx.request_id());
        let _guard = span.enter();

        let track = self
            .decoder
            .decode_audio(media, self.config.audio.sample_rate, ctx)?;
        let disfluency_count = self.analyze_audio(&track)?;

        let mut frames = self
            .decoder
            .decode_video(media, self.config.eye.mirror_frames, ctx)?;
        let eye = self.analyze_video(frames.as_mut())?;

        let breakdown = ScoreBreakdown::from_counts(disfluency_count, eye);
        info!(
            disfluency_count = breakdown.disfluency_count,
            gaze_count = breakdown.gaze_count,
            blink_count = breakdown.blink_count,
            composite_score = breakdown.composite_score,
            "Analysis complete"
        );
        Ok(breakdown)
    }

    /// Score `media` inside a fresh working directory under `work_root`.
    ///
    /// The directory is removed afterwards whether or not the run succeeded.
    pub fn analyze_isolated(
        &self,
        media: &Path,
        work_root: &Path,
    ) -> AnalysisResult<(AnalysisContext, ScoreBreakdown)> {
        let ctx = AnalysisContext::new(work_root);
        ctx.prepare()?;

        let result = self.analyze(&ctx, media);

        if let Err(e) = ctx.cleanup() {
            warn!(request_id = %ctx.request_id(), error = %e, "Failed to remove working directory");
        }
        result.map(|breakdown| (ctx, breakdown))
    }

    /// Count disfluency episodes in an already decoded audio track
    pub fn analyze_audio(&self, track: &AudioTrack) -> AnalysisResult<u32> {
        let classifier = AudioWindowClassifier::new(
            self.extractor.as_ref(),
            self.models.disfluency.as_ref(),
            &self.config.audio,
        );
        classifier.process(track)
    }

    /// Count gaze-aversion and blink episodes over a frame source
    pub fn analyze_video(&self, frames: &mut dyn FrameSource) -> AnalysisResult<EyeCounts> {
        let adapter = EyeClassifierAdapter::new(
            self.models.gaze.as_ref(),
            self.models.blink.as_ref(),
            self.config.eye.crop_width_scale,
        );
        let mut tracker = EyeStateTracker::new(&self.config.eye);
        tracker.process(frames, self.models.detector.as_ref(), &adapter)
    }
}
