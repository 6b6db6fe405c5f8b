//! Per-frame eye classification
//!
//! Turns one detected face in one frame into a gaze label and a blink score.

use super::{BlinkClassifier, GazeClassifier};
use crate::error::{AnalysisError, AnalysisResult};
use crate::eye_patch::{eye_rect, extract_patches};
use crate::media::Frame;
use crate::types::{FaceLandmarks, GazeLabel};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Classifier outputs for one face in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeObservation {
    pub gaze: GazeLabel,
    /// Eye-open probability scaled to `[0, 100]`, rounded to 3 decimals
    #[serde(alias = "blink")]
    pub blink_score: f32,
}

impl EyeObservation {
    pub fn new(gaze: GazeLabel, blink_score: f32) -> Self {
        Self { gaze, blink_score }
    }
}

/// Wraps the gaze and blink models behind a single per-face call
pub struct EyeClassifierAdapter<'a> {
    gaze: &'a dyn GazeClassifier,
    blink: &'a dyn BlinkClassifier,
    crop_width_scale: f32,
}

impl<'a> EyeClassifierAdapter<'a> {
    pub fn new(
        gaze: &'a dyn GazeClassifier,
        blink: &'a dyn BlinkClassifier,
        crop_width_scale: f32,
    ) -> Self {
        Self {
            gaze,
            blink,
            crop_width_scale,
        }
    }

    /// Classify the eye of one face.
    ///
    /// Returns `Ok(None)` when the eye crop falls entirely outside the frame.
    pub fn classify_face(
        &self,
        frame: &Frame,
        face: &FaceLandmarks,
    ) -> AnalysisResult<Option<EyeObservation>> {
        let Some(rect) = eye_rect(face.left_eye(), self.crop_width_scale) else {
            return Ok(None);
        };
        let Some(patches) = extract_patches(frame, rect) else {
            trace!(frame = frame.index(), ?rect, "Eye crop outside frame");
            return Ok(None);
        };

        let probability = self.blink.classify(&patches.blink)?;
        let blink_score = scale_blink_probability(probability)?;
        let gaze = self.gaze.classify(&patches.gaze)?;

        Ok(Some(EyeObservation { gaze, blink_score }))
    }
}

/// Scale a `[0, 1]` model output to the tracker's `[0, 100]` range
fn scale_blink_probability(probability: f32) -> AnalysisResult<f32> {
    if !probability.is_finite() {
        return Err(AnalysisError::Classifier(format!(
            "blink model returned non-finite output {probability}"
        )));
    }
    let scaled = probability * 100.0;
    Ok((scaled * 1000.0).round() / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eye_patch::EyePatch;
    use crate::types::Point;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedGaze(GazeLabel);

    impl GazeClassifier for FixedGaze {
        fn classify(&self, patch: &EyePatch) -> AnalysisResult<GazeLabel> {
            assert_eq!((patch.width(), patch.height()), (64, 56));
            Ok(self.0)
        }
    }

    struct FixedBlink {
        probability: f32,
        calls: AtomicU32,
    }

    impl BlinkClassifier for FixedBlink {
        fn classify(&self, patch: &EyePatch) -> AnalysisResult<f32> {
            assert_eq!((patch.width(), patch.height()), (64, 64));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }
    }

    struct FailingGaze;

    impl GazeClassifier for FailingGaze {
        fn classify(&self, _patch: &EyePatch) -> AnalysisResult<GazeLabel> {
            Err(AnalysisError::Classifier("gaze model unavailable".into()))
        }
    }

    fn face_with_eye_at(x: f32, y: f32) -> FaceLandmarks {
        let mut points = vec![Point::new(0.0, 0.0); 68];
        let offsets = [
            (0.0, 0.0),
            (10.0, -5.0),
            (20.0, -5.0),
            (30.0, 0.0),
            (20.0, 5.0),
            (10.0, 5.0),
        ];
        for (i, (dx, dy)) in offsets.iter().enumerate() {
            points[36 + i] = Point::new(x + dx, y + dy);
        }
        FaceLandmarks::new(points).unwrap()
    }

    fn frame() -> Frame {
        Frame::new(0, GrayImage::from_pixel(320, 240, Luma([128])))
    }

    #[test]
    fn test_classify_face() {
        let gaze = FixedGaze(GazeLabel::Left);
        let blink = FixedBlink {
            probability: 0.87654,
            calls: AtomicU32::new(0),
        };
        let adapter = EyeClassifierAdapter::new(&gaze, &blink, 1.2);

        let obs = adapter
            .classify_face(&frame(), &face_with_eye_at(100.0, 100.0))
            .unwrap()
            .unwrap();

        assert_eq!(obs.gaze, GazeLabel::Left);
        assert!((obs.blink_score - 87.654).abs() < 1e-3);
        assert_eq!(blink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_eye_outside_frame_is_skipped() {
        let gaze = FixedGaze(GazeLabel::Center);
        let blink = FixedBlink {
            probability: 1.0,
            calls: AtomicU32::new(0),
        };
        let adapter = EyeClassifierAdapter::new(&gaze, &blink, 1.2);

        let obs = adapter
            .classify_face(&frame(), &face_with_eye_at(1000.0, 1000.0))
            .unwrap();
        assert!(obs.is_none());
        assert_eq!(blink.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let blink = FixedBlink {
            probability: 1.0,
            calls: AtomicU32::new(0),
        };
        let adapter = EyeClassifierAdapter::new(&FailingGaze, &blink, 1.2);

        let err = adapter
            .classify_face(&frame(), &face_with_eye_at(100.0, 100.0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(_)));
    }

    #[test]
    fn test_blink_scaling() {
        assert_eq!(scale_blink_probability(0.0).unwrap(), 0.0);
        assert!((scale_blink_probability(0.0004).unwrap() - 0.04).abs() < 1e-6);
        assert!((scale_blink_probability(1.0).unwrap() - 100.0).abs() < 1e-6);
        assert!(scale_blink_probability(f32::NAN).is_err());
    }
}
