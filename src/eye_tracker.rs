//! Eye-state temporal tracking
//!
//! Consumes per-frame eye observations and reduces them to gaze-aversion and
//! blink episode counts through two hysteresis counters.

use crate::classifiers::{EyeClassifierAdapter, EyeObservation, FaceLandmarkDetector};
use crate::config::EyeTrackerConfig;
use crate::error::AnalysisResult;
use crate::hysteresis::HysteresisCounter;
use crate::media::FrameSource;
use crate::types::EyeCounts;
use tracing::{debug, trace};

/// Hysteresis state for the gaze and blink signals of one analysis run
#[derive(Debug, Clone)]
pub struct EyeStateTracker {
    gaze: HysteresisCounter,
    blink: HysteresisCounter,
    blink_threshold: f32,
    frames_seen: u64,
    frames_without_face: u64,
}

impl Default for EyeStateTracker {
    fn default() -> Self {
        Self::new(&EyeTrackerConfig::default())
    }
}

impl EyeStateTracker {
    pub fn new(config: &EyeTrackerConfig) -> Self {
        Self {
            gaze: HysteresisCounter::new(config.gaze_frames),
            blink: HysteresisCounter::new(config.blink_frames),
            blink_threshold: config.blink_threshold,
            frames_seen: 0,
            frames_without_face: 0,
        }
    }

    /// Feed one face observation into both counters
    pub fn observe(&mut self, obs: &EyeObservation) {
        if self.gaze.observe(obs.gaze.is_averted()) {
            trace!(gaze = %obs.gaze, "Gaze aversion event");
        }
        if self.blink.observe(obs.blink_score < self.blink_threshold) {
            trace!(blink_score = obs.blink_score, "Blink event");
        }
    }

    /// Record a frame in which no face was found.
    ///
    /// Counters are left untouched: an open run continues across the gap.
    pub fn skip_frame(&mut self) {
        self.frames_without_face += 1;
    }

    pub fn counts(&self) -> EyeCounts {
        EyeCounts {
            gaze_count: self.gaze.events(),
            blink_count: self.blink.events(),
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_without_face(&self) -> u64 {
        self.frames_without_face
    }

    /// Drive every frame of `frames` through detection and classification.
    ///
    /// All faces found in a frame feed the same counters, in detection order.
    pub fn process(
        &mut self,
        frames: &mut dyn FrameSource,
        detector: &dyn FaceLandmarkDetector,
        adapter: &EyeClassifierAdapter<'_>,
    ) -> AnalysisResult<EyeCounts> {
        while let Some(frame) = frames.next_frame()? {
            self.frames_seen += 1;

            let faces = detector.detect(&frame)?;
            if faces.is_empty() {
                self.skip_frame();
                continue;
            }

            for face in &faces {
                if let Some(obs) = adapter.classify_face(&frame, face)? {
                    self.observe(&obs);
                }
            }
        }

        let counts = self.counts();
        debug!(
            frames = self.frames_seen,
            frames_without_face = self.frames_without_face,
            gaze_count = counts.gaze_count,
            blink_count = counts.blink_count,
            "Eye-state tracking complete"
        );
        Ok(counts)
    }
}

/// Replay a stream of observations through a fresh tracker
pub fn track_observations<'o, I>(observations: I, config: &EyeTrackerConfig) -> EyeCounts
where
    I: IntoIterator<Item = &'o EyeObservation>,
{
    let mut tracker = EyeStateTracker::new(config);
    for obs in observations {
        tracker.observe(obs);
    }
    tracker.counts()
}
