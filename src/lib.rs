//! Fitlytics Core - Deterministic signal features and score calibration for wearables
//!
//! Fitlytics turns raw wearable data into model-ready inputs and model outputs into
//! reportable values through three deterministic pipelines:
//!
//! - **Activity**: raw IMU/thermal samples → normalization → statistical feature
//!   vector in the classifier's column order → activity label
//! - **Fitness**: workout and physiology columns → regressor → logistic squash,
//!   rule-based penalties and clamping → 1-100 fitness score
//! - **Form**: an exercise window of IMU samples → range of motion, stability and
//!   tempo → Bad / Good / Beast form score
//!
//! Trained models are consumed through the [`model::Predictor`] trait and are never
//! trained here.

pub mod calibration;
pub mod encoder;
pub mod error;
pub mod features;
pub mod fitness;
pub mod form;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use calibration::{calibrate, calibrate_score, squash};
pub use error::ComputeError;
pub use features::FeatureExtractor;
pub use form::{Exercise, FormEvaluator};
pub use model::{ModelArtifact, Predictor};
pub use normalizer::Normalizer;
pub use pipeline::{
    classify_activity, classify_frame, evaluate_form, predict_fitness, FitlyticsEngine,
};

/// Crate version embedded in all payloads
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for payloads
pub const PRODUCER_NAME: &str = "fitlytics-core";
