//! Engage Score - Temporal engagement scoring for recorded interviews
//!
//! A recording is scored on three behavioral signals through a deterministic
//! pipeline: audio windows → disfluency episodes, video frames → gaze-aversion
//! and blink episodes, then a bucketed weighted aggregate.
//!
//! ## Modules
//!
//! - **Temporal core**: hysteresis counters, the eye-state tracker, the audio
//!   window classifier and the score aggregator
//! - **Collaborators**: traits for the trained models and media decoding, with
//!   built-in MFCC extraction, WAV decoding and image-sequence frame sources
//! - **Replay**: score recorded classifier traces without any model

pub mod audio_windows;
pub mod classifiers;
pub mod config;
pub mod context;
pub mod encoder;
pub mod error;
pub mod eye_patch;
pub mod eye_tracker;
pub mod features;
pub mod hysteresis;
pub mod media;
pub mod pipeline;
pub mod scoring;
pub mod trace;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::AnalysisConfig;
pub use context::AnalysisContext;
pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{InterviewAnalyzer, Models};
pub use scoring::aggregate;
pub use trace::score_trace;
pub use types::{EyeCounts, GazeLabel, ScoreBreakdown, SubScores};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "engage-score";
