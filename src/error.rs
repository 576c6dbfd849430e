//! Error types for Fitlytics

use thiserror::Error;

/// Errors that can occur while extracting features, predicting or calibrating.
///
/// A sensor channel that is simply absent is never an error: its features are
/// omitted and later filled with 0 during selection.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Malformed or non-numeric input field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Feature vector or request row does not match the artifact layout
    #[error("Model input error: {0}")]
    ModelInput(String),

    /// Failure inside the predictor itself
    #[error("Model inference error: {0}")]
    ModelInference(String),

    /// Model artifact could not be loaded or is internally inconsistent
    #[error("Model artifact error: {0}")]
    ArtifactError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
