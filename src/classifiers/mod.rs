//! Model collaborators
//!
//! Trained models and the landmark detector are opaque to the engine. They are
//! plugged in through the traits below; loading and running them (ONNX,
//! TensorFlow, a remote service) happens behind these seams. Implementations
//! must be `Send + Sync`: one analyzer may serve concurrent runs.

mod eye;

pub use eye::{EyeClassifierAdapter, EyeObservation};

use crate::error::AnalysisResult;
use crate::eye_patch::EyePatch;
use crate::features::FeatureMatrix;
use crate::media::Frame;
use crate::types::{FaceLandmarks, GazeLabel};
use ndarray::Array2;

/// Trait for gaze-direction models (input: 64 × 56 patch)
pub trait GazeClassifier: Send + Sync {
    fn classify(&self, patch: &EyePatch) -> AnalysisResult<GazeLabel>;
}

/// Trait for blink models (input: 64 × 64 patch).
///
/// Returns the model's eye-open probability in `[0, 1]`.
pub trait BlinkClassifier: Send + Sync {
    fn classify(&self, patch: &EyePatch) -> AnalysisResult<f32>;
}

/// Trait for disfluency models (input: 32 × 32 feature matrix).
///
/// Returns a disfluency probability in `[0, 1]`.
pub trait DisfluencyClassifier: Send + Sync {
    fn classify(&self, features: &FeatureMatrix) -> AnalysisResult<f32>;
}

/// Trait for 68-point face landmark detectors
pub trait FaceLandmarkDetector: Send + Sync {
    /// All faces found in the frame; an empty vector when there are none
    fn detect(&self, frame: &Frame) -> AnalysisResult<Vec<FaceLandmarks>>;
}

/// Trait for spectral feature extractors.
///
/// Returns a 32-row matrix with one column per analysis frame. Short or empty
/// input may yield fewer than 32 columns, including none.
pub trait AudioFeatureExtractor: Send + Sync {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Array2<f32>>;
}
