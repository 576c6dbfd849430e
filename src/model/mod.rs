//! Predictor adapters
//!
//! A trained model is an opaque capability: `predict(rows) -> scalars`. This module
//! defines that seam, pairs a predictor with the feature/column order it was trained
//! on, and enforces the layout contract before any row reaches the predictor.

mod centroid;
mod linear;

pub use centroid::{Centroid, NearestCentroid};
pub use linear::LinearModel;

use crate::error::ComputeError;
use crate::normalizer::coerce_number;
use crate::types::FeatureVector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Trait for trained models consumed as `predict(rows) -> scalars`
///
/// Implementations must be deterministic for identical rows and must be safe for
/// unsynchronized concurrent reads.
pub trait Predictor: Send + Sync {
    /// Predict one scalar per row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError>;
}

/// Serialized predictor parameters bundled with this crate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorSpec {
    Linear { weights: Vec<f64>, intercept: f64 },
    NearestCentroid { centroids: Vec<Centroid> },
}

/// On-disk model artifact document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    /// Training-time column order
    pub feature_names: Vec<String>,
    pub predictor: PredictorSpec,
}

/// A loaded model together with the column order it expects
pub struct ModelArtifact {
    feature_names: Vec<String>,
    predictor: Box<dyn Predictor>,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("feature_names", &self.feature_names)
            .finish_non_exhaustive()
    }
}

impl ModelArtifact {
    /// Wrap any predictor with its expected feature order
    pub fn new(feature_names: Vec<String>, predictor: Box<dyn Predictor>) -> Self {
        Self {
            feature_names,
            predictor,
        }
    }

    /// Build an artifact from a parsed spec, checking parameter shapes
    pub fn from_spec(spec: ArtifactSpec) -> Result<Self, ComputeError> {
        let width = spec.feature_names.len();
        if width == 0 {
            return Err(ComputeError::ArtifactError(
                "artifact declares no feature names".to_string(),
            ));
        }

        let predictor: Box<dyn Predictor> = match spec.predictor {
            PredictorSpec::Linear { weights, intercept } => {
                Box::new(LinearModel::new(weights, intercept, width)?)
            }
            PredictorSpec::NearestCentroid { centroids } => {
                Box::new(NearestCentroid::new(centroids, width)?)
            }
        };

        Ok(Self::new(spec.feature_names, predictor))
    }

    /// Parse an artifact from its JSON document
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let spec: ArtifactSpec = serde_json::from_str(json)?;
        Self::from_spec(spec)
    }

    /// Read and parse an artifact file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::ArtifactError(format!("cannot read {}: {e}", path.display()))
        })?;
        let artifact = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            features = artifact.feature_names.len(),
            "loaded model artifact"
        );
        Ok(artifact)
    }

    /// Training-time feature/column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Predict from a feature vector that must match the artifact layout exactly
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<f64, ComputeError> {
        if vector.names.len() != self.feature_names.len()
            || vector.values.len() != self.feature_names.len()
        {
            return Err(ComputeError::ModelInput(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                vector.values.len()
            )));
        }

        if let Some((idx, (got, want))) = vector
            .names
            .iter()
            .zip(&self.feature_names)
            .enumerate()
            .find(|(_, (got, want))| got != want)
        {
            return Err(ComputeError::ModelInput(format!(
                "feature {idx} is '{got}', expected '{want}'"
            )));
        }

        self.predict_single(vector.values.clone())
    }

    /// Reorder a row of named columns into the artifact's column order and predict
    pub fn predict_row(&self, row: &Map<String, Value>) -> Result<f64, ComputeError> {
        let values = self
            .feature_names
            .iter()
            .map(|name| match row.get(name) {
                Some(value) => coerce_number(name, value),
                None => Err(ComputeError::ModelInput(format!(
                    "missing column '{name}'"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.predict_single(values)
    }

    fn predict_single(&self, values: Vec<f64>) -> Result<f64, ComputeError> {
        let outputs = self.predictor.predict(&[values])?;

        match outputs.as_slice() {
            [value] if value.is_finite() => Ok(*value),
            [value] => Err(ComputeError::ModelInference(format!(
                "predictor returned non-finite value {value}"
            ))),
            other => Err(ComputeError::ModelInference(format!(
                "predictor returned {} values for 1 row",
                other.len()
            ))),
        }
    }
}

/// Reject a row whose width differs from the model's
pub(crate) fn check_row_width(row: &[f64], width: usize) -> Result<(), ComputeError> {
    if row.len() != width {
        return Err(ComputeError::ModelInput(format!(
            "row has {} values, model expects {width}",
            row.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedPredictor(Vec<f64>);

    impl Predictor for FixedPredictor {
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
            Err(ComputeError::ModelInference("tree ensemble exploded".to_string()))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn vector(list: &[&str], values: &[f64]) -> FeatureVector {
        FeatureVector {
            names: names(list),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_predict_vector_checks_length() {
        let artifact = ModelArtifact::new(names(&["a", "b"]), Box::new(FixedPredictor(vec![1.0])));
        let result = artifact.predict_vector(&vector(&["a"], &[1.0]));
        assert!(matches!(result, Err(ComputeError::ModelInput(_))));
    }

    #[test]
    fn test_predict_vector_checks_order() {
        let artifact = ModelArtifact::new(names(&["a", "b"]), Box::new(FixedPredictor(vec![1.0])));
        let result = artifact.predict_vector(&vector(&["b", "a"], &[1.0, 2.0]));
        assert!(matches!(result, Err(ComputeError::ModelInput(_))));

        let ok = artifact.predict_vector(&vector(&["a", "b"], &[1.0, 2.0]));
        assert_eq!(ok.unwrap(), 1.0);
    }

    #[test]
    fn test_inference_errors_propagate() {
        let artifact = ModelArtifact::new(names(&["a"]), Box::new(FailingPredictor));
        let err = artifact.predict_vector(&vector(&["a"], &[1.0])).unwrap_err();
        assert_eq!(err.to_string(), "Model inference error: tree ensemble exploded");
    }

    #[test]
    fn test_output_shape_is_checked() {
        let empty = ModelArtifact::new(names(&["a"]), Box::new(FixedPredictor(vec![])));
        assert!(matches!(
            empty.predict_vector(&vector(&["a"], &[1.0])),
            Err(ComputeError::ModelInference(_))
        ));

        let nan = ModelArtifact::new(names(&["a"]), Box::new(FixedPredictor(vec![f64::NAN])));
        assert!(matches!(
            nan.predict_vector(&vector(&["a"], &[1.0])),
            Err(ComputeError::ModelInference(_))
        ));
    }

    #[test]
    fn test_predict_row_reorders_columns() {
        let artifact = ModelArtifact::from_json(
            r#"{
                "feature_names": ["age", "bmi"],
                "predictor": {"kind": "linear", "weights": [1.0, 10.0], "intercept": 0.5}
            }"#,
        )
        .unwrap();

        let row = json!({"bmi": 2, "age": 30, "ignored": "text"});
        let value = artifact.predict_row(row.as_object().unwrap()).unwrap();
        assert!((value - 50.5).abs() < 1e-12);
    }

    #[test]
    fn test_predict_row_errors() {
        let artifact = ModelArtifact::from_json(
            r#"{
                "feature_names": ["age", "bmi"],
                "predictor": {"kind": "linear", "weights": [1.0, 1.0], "intercept": 0.0}
            }"#,
        )
        .unwrap();

        let missing = json!({"age": 30});
        assert!(matches!(
            artifact.predict_row(missing.as_object().unwrap()),
            Err(ComputeError::ModelInput(_))
        ));

        let bad = json!({"age": 30, "bmi": "heavy"});
        assert!(matches!(
            artifact.predict_row(bad.as_object().unwrap()),
            Err(ComputeError::Validation(_))
        ));
    }

    #[test]
    fn test_artifact_shape_validation() {
        let mismatch = ModelArtifact::from_json(
            r#"{
                "feature_names": ["a", "b"],
                "predictor": {"kind": "linear", "weights": [1.0], "intercept": 0.0}
            }"#,
        );
        assert!(matches!(mismatch, Err(ComputeError::ArtifactError(_))));

        let empty = ModelArtifact::from_json(
            r#"{"feature_names": [], "predictor": {"kind": "linear", "weights": [], "intercept": 0.0}}"#,
        );
        assert!(matches!(empty, Err(ComputeError::ArtifactError(_))));

        let unknown = ModelArtifact::from_json(
            r#"{"feature_names": ["a"], "predictor": {"kind": "xgboost"}}"#,
        );
        assert!(matches!(unknown, Err(ComputeError::JsonError(_))));
    }
}
