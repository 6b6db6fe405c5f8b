//! Error types for the engagement scoring engine

use thiserror::Error;

/// Errors that abort an analysis run.
///
/// No variant carries a partial score: once any stage fails, the run produces
/// nothing.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to read media: {0}")]
    MediaRead(String),

    #[error("Classifier failed: {0}")]
    Classifier(String),

    #[error("Feature matrix has wrong shape: {0}")]
    FeatureShape(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse signal trace: {0}")]
    TraceParse(String),
}

/// Result alias used throughout the crate
pub type AnalysisResult<T> = Result<T, AnalysisError>;
