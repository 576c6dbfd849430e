//! Pipeline orchestration
//!
//! This module provides the public API for Fitlytics.
//! It wires the stages of both pipelines together:
//! - Activity: sensor JSON → Normalizer → FeatureExtractor → ModelArtifact → label
//! - Fitness: request JSON → ModelArtifact → calibration → score
//! - Form: sensor JSON → Normalizer → FormEvaluator → form score (no model)

use crate::calibration::calibrate;
use crate::encoder::PredictionEncoder;
use crate::error::ComputeError;
use crate::features::FeatureExtractor;
use crate::fitness::RawFitnessInputs;
use crate::form::{Exercise, FormEvaluation, FormEvaluator};
use crate::model::ModelArtifact;
use crate::normalizer::{json_kind, Normalizer};
use crate::types::{CalibrationReport, SensorFrame};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Classify a raw sensor object into an activity label.
///
/// # Arguments
/// * `sensor` - Raw sensor object, e.g. `{"ax": 120, "ay": [-30, -31], "temp": 25}`
/// * `model` - Activity classifier and its feature order
///
/// # Example
/// ```ignore
/// let label = classify_activity(&sensor, &model)?;
/// ```
pub fn classify_activity(
    sensor: &Map<String, Value>,
    model: &ModelArtifact,
) -> Result<i64, ComputeError> {
    // Stage 1: Normalize channels
    let frame = Normalizer::normalize(sensor)?;

    classify_frame(&frame, model)
}

/// Classify an already-normalized frame
pub fn classify_frame(frame: &SensorFrame, model: &ModelArtifact) -> Result<i64, ComputeError> {
    // Stage 2: Extract and order features
    let vector = FeatureExtractor::extract_vector(frame, model.feature_names())?;

    // Stage 3: Predict and truncate to a label
    let prediction = model.predict_vector(&vector)?;
    Ok(prediction.trunc() as i64)
}

/// Predict and calibrate a fitness score for a request row of named columns.
///
/// The same request feeds both the regressor (reordered to the model's columns) and
/// the calibration penalties.
pub fn predict_fitness(
    request: &Map<String, Value>,
    model: &ModelArtifact,
) -> Result<CalibrationReport, ComputeError> {
    let raw = model.predict_row(request)?;
    calibrate(raw, request)
}

/// Score a raw sensor window as a repetition of `exercise`
pub fn evaluate_form(
    sensor: &Map<String, Value>,
    exercise: Exercise,
) -> Result<FormEvaluation, ComputeError> {
    let frame = Normalizer::normalize(sensor)?;
    FormEvaluator::evaluate(exercise, &frame)
}

/// Parse a JSON document that must be an object
pub fn parse_object(json: &str) -> Result<Map<String, Value>, ComputeError> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ComputeError::Validation(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Long-lived holder of the loaded model artifacts.
///
/// Artifacts are loaded once and shared read-only; cloning the engine is cheap and
/// clones can serve requests from different threads without locking.
#[derive(Clone)]
pub struct FitlyticsEngine {
    activity_model: Option<Arc<ModelArtifact>>,
    fitness_model: Option<Arc<ModelArtifact>>,
    encoder: Arc<PredictionEncoder>,
}

impl Default for FitlyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FitlyticsEngine {
    /// Create an engine with no models loaded
    pub fn new() -> Self {
        Self {
            activity_model: None,
            fitness_model: None,
            encoder: Arc::new(PredictionEncoder::new()),
        }
    }

    /// Use the activity classifier
    pub fn with_activity_model(mut self, model: ModelArtifact) -> Self {
        self.activity_model = Some(Arc::new(model));
        self
    }

    /// Use the fitness regressor
    pub fn with_fitness_model(mut self, model: ModelArtifact) -> Self {
        self.fitness_model = Some(Arc::new(model));
        self
    }

    /// Use a specific payload encoder
    pub fn with_encoder(mut self, encoder: PredictionEncoder) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Load whichever artifacts are given from disk
    pub fn load(
        activity_path: Option<&Path>,
        fitness_path: Option<&Path>,
    ) -> Result<Self, ComputeError> {
        let mut engine = Self::new();
        if let Some(path) = activity_path {
            engine = engine.with_activity_model(ModelArtifact::load(path)?);
        }
        if let Some(path) = fitness_path {
            engine = engine.with_fitness_model(ModelArtifact::load(path)?);
        }
        Ok(engine)
    }

    pub fn activity_model(&self) -> Option<&ModelArtifact> {
        self.activity_model.as_deref()
    }

    pub fn fitness_model(&self) -> Option<&ModelArtifact> {
        self.fitness_model.as_deref()
    }

    fn require_activity(&self) -> Result<&ModelArtifact, ComputeError> {
        self.activity_model()
            .ok_or_else(|| ComputeError::ArtifactError("no activity model loaded".to_string()))
    }

    fn require_fitness(&self) -> Result<&ModelArtifact, ComputeError> {
        self.fitness_model()
            .ok_or_else(|| ComputeError::ArtifactError("no fitness model loaded".to_string()))
    }

    /// Classify a sensor object
    pub fn classify(&self, sensor: &Map<String, Value>) -> Result<i64, ComputeError> {
        classify_activity(sensor, self.require_activity()?)
    }

    /// Score a request row of model columns
    pub fn score(&self, request: &Map<String, Value>) -> Result<CalibrationReport, ComputeError> {
        predict_fitness(request, self.require_fitness()?)
    }

    /// Engineer model columns from raw form inputs, then score them
    pub fn score_raw_inputs(
        &self,
        inputs: &RawFitnessInputs,
    ) -> Result<CalibrationReport, ComputeError> {
        for warning in inputs.range_warnings() {
            tracing::warn!(%warning, "fitness input outside training range");
        }
        let request = inputs.engineer()?;
        self.score(&request)
    }

    /// Classify sensor JSON and encode the activity payload
    pub fn classify_json(&self, sensor_json: &str) -> Result<String, ComputeError> {
        let frame = Normalizer::normalize(&parse_object(sensor_json)?)?;
        let label = classify_frame(&frame, self.require_activity()?)?;
        self.encoder.activity_to_json(label, frame.len())
    }

    /// Score request JSON and encode the fitness payload
    pub fn score_json(&self, request_json: &str) -> Result<String, ComputeError> {
        let request = parse_object(request_json)?;
        let report = self.score(&request)?;
        self.encoder.fitness_to_json(&report)
    }

    /// Evaluate an exercise window and encode the form payload.
    ///
    /// Needs no loaded model.
    pub fn evaluate_form_json(
        &self,
        exercise: Exercise,
        sensor_json: &str,
    ) -> Result<String, ComputeError> {
        let form = evaluate_form(&parse_object(sensor_json)?, exercise)?;
        self.encoder.form_to_json(&form)
    }

    /// Score raw form-input JSON and encode the fitness payload
    pub fn score_raw_inputs_json(&self, inputs_json: &str) -> Result<String, ComputeError> {
        let inputs = RawFitnessInputs::from_json(inputs_json)?;
        let report = self.score_raw_inputs(&inputs)?;
        self.encoder.fitness_to_json(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Predictor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed value and records the width of the last row it saw
    struct StubPredictor {
        value: f64,
        last_width: AtomicUsize,
    }

    impl StubPredictor {
        fn new(value: f64) -> Self {
            Self {
                value,
                last_width: AtomicUsize::new(0),
            }
        }
    }

    impl Predictor for StubPredictor {
        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
            self.last_width.store(rows[0].len(), Ordering::SeqCst);
            Ok(vec![self.value; rows.len()])
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn activity_artifact() -> ModelArtifact {
        ModelArtifact::from_json(
            r#"{
                "feature_names": ["acc_mag_mean", "gx_std", "dom_freq"],
                "predictor": {
                    "kind": "nearest_centroid",
                    "centroids": [
                        {"label": 0, "center": [1.0, 0.0, 0.0]},
                        {"label": 1, "center": [5.0, 2.0, 0.0]},
                        {"label": 2, "center": [12.0, 8.0, 0.0]}
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn fitness_artifact() -> ModelArtifact {
        ModelArtifact::from_json(
            r#"{
                "feature_names": ["calories_burned", "hours_sleep"],
                "predictor": {"kind": "linear", "weights": [0.5, 2.0], "intercept": 5.0}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_classify_activity_end_to_end() {
        let model = activity_artifact();

        let resting = as_map(json!({"ax": 0.6, "ay": 0.8, "az": 0.0, "gx": [0.1, 0.1]}));
        assert_eq!(classify_activity(&resting, &model).unwrap(), 0);

        let walking = as_map(json!({
            "ax": [3.0, 4.0, 3.0, 4.0],
            "ay": [0.0, 3.0, 4.0, 3.0],
            "az": 0.0,
            "gx": [-2.0, 2.0, -2.0, 2.0]
        }));
        assert_eq!(classify_activity(&walking, &model).unwrap(), 1);
    }

    #[test]
    fn test_classify_missing_channels_default_to_zero() {
        let stub = Arc::new(StubPredictor::new(2.9));
        struct Shared(Arc<StubPredictor>);
        impl Predictor for Shared {
            fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
                self.0.predict(rows)
            }
        }

        let names: Vec<String> = ["ax_mean", "gz_energy", "temp_std", "dom_freq", "acc_mag_std"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let model = ModelArtifact::new(names, Box::new(Shared(stub.clone())));

        let label = classify_activity(&as_map(json!({"temp": 30})), &model).unwrap();

        // float outputs are truncated toward zero
        assert_eq!(label, 2);
        assert_eq!(stub.last_width.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_classify_frame_matches_raw_sensor_path() {
        let model = activity_artifact();
        let sensor = as_map(json!({"ax": [3.0, 4.0], "ay": [0.0, 3.0], "az": 0.0, "gx": [-2.0, 2.0]}));
        let frame = Normalizer::normalize(&sensor).unwrap();

        assert_eq!(
            classify_frame(&frame, &model).unwrap(),
            classify_activity(&sensor, &model).unwrap()
        );
    }

    #[test]
    fn test_classify_json_requires_model_before_encoding() {
        let engine = FitlyticsEngine::new();
        assert!(matches!(
            engine.classify_json(r#"{"ax": 1}"#),
            Err(ComputeError::ArtifactError(_))
        ));
        // malformed samples are reported before the missing model
        assert!(matches!(
            engine.classify_json(r#"{"ax": "fast"}"#),
            Err(ComputeError::Validation(_))
        ));
    }

    #[test]
    fn test_classify_rejects_bad_samples() {
        let model = activity_artifact();
        let result = classify_activity(&as_map(json!({"ax": "high"})), &model);
        assert!(matches!(result, Err(ComputeError::Validation(_))));
    }

    #[test]
    fn test_predict_fitness_end_to_end() {
        let model = fitness_artifact();
        // raw = 5 + 0.5*200 + 2*5 = 115
        let request = as_map(json!({"calories_burned": 200, "hours_sleep": 5}));
        let report = predict_fitness(&request, &model).unwrap();

        assert_eq!(report.raw, 115.0);
        assert_eq!(report.penalties.len(), 1);
        assert_eq!(report.penalties[0].rule, "sleep_deficit");
        assert!((1.0..=100.0).contains(&report.score));
    }

    #[test]
    fn test_predict_fitness_missing_column() {
        let model = fitness_artifact();
        let request = as_map(json!({"calories_burned": 200}));
        assert!(matches!(
            predict_fitness(&request, &model),
            Err(ComputeError::ModelInput(_))
        ));
    }

    #[test]
    fn test_engine_requires_models() {
        let engine = FitlyticsEngine::new();
        assert!(matches!(
            engine.classify(&Map::new()),
            Err(ComputeError::ArtifactError(_))
        ));
        assert!(matches!(
            engine.score(&Map::new()),
            Err(ComputeError::ArtifactError(_))
        ));
    }

    #[test]
    fn test_engine_json_payloads() {
        let engine = FitlyticsEngine::new()
            .with_activity_model(activity_artifact())
            .with_fitness_model(fitness_artifact());

        let activity: Value =
            serde_json::from_str(&engine.classify_json(r#"{"ax": 1, "ay": 0, "az": 0}"#).unwrap())
                .unwrap();
        assert_eq!(activity["activity"], 0);
        assert_eq!(activity["channels_present"], 3);

        let fitness: Value = serde_json::from_str(
            &engine
                .score_json(r#"{"calories_burned": 300, "hours_sleep": 8}"#)
                .unwrap(),
        )
        .unwrap();
        let score = fitness["fitness_score"].as_f64().unwrap();
        assert!((1.0..=100.0).contains(&score));
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = FitlyticsEngine::new().with_fitness_model(fitness_artifact());
        let request = as_map(json!({"calories_burned": 150, "hours_sleep": 7}));
        let expected = engine.score(&request).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let request = request.clone();
                std::thread::spawn(move || engine.score(&request).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_score_raw_inputs() {
        let model = ModelArtifact::from_json(
            r#"{
                "feature_names": ["workload", "recovery_score", "gender"],
                "predictor": {"kind": "linear", "weights": [1.0, 100.0, 0.0], "intercept": 0.0}
            }"#,
        )
        .unwrap();
        let engine = FitlyticsEngine::new().with_fitness_model(model);

        let inputs = RawFitnessInputs::from_json(
            r#"{
                "calories_burned": 90, "duration_minutes": 30, "resting_heart_rate": 59,
                "gender": "Male", "age": 40, "activity_type": "Cycling", "bmi": 24,
                "intensity": "Medium", "hours_sleep": 6, "daily_steps": 9000
            }"#,
        )
        .unwrap();
        let report = engine.score_raw_inputs(&inputs).unwrap();

        // workload 1*30 + 100 * 6/60
        assert!((report.raw - 40.0).abs() < 1e-9);
        // calories 90 < 120 is the only penalty
        assert_eq!(report.penalties.len(), 1);
        assert_eq!(report.penalties[0].rule, "low_calories");
    }

    fn flat_fitness_engine() -> FitlyticsEngine {
        // constant raw 55 squashes to exactly 50
        let model = ModelArtifact::from_json(
            r#"{
                "feature_names": ["workload", "intensity"],
                "predictor": {"kind": "linear", "weights": [0.0, 0.0], "intercept": 55.0}
            }"#,
        )
        .unwrap();
        FitlyticsEngine::new().with_fitness_model(model)
    }

    fn form_inputs(intensity: &str, duration: f64, calories: f64) -> RawFitnessInputs {
        RawFitnessInputs {
            calories_burned: calories,
            duration_minutes: duration,
            resting_heart_rate: 60.0,
            gender: "Other".to_string(),
            age: 35.0,
            activity_type: "Running".to_string(),
            bmi: 22.0,
            intensity: intensity.to_string(),
            hours_sleep: 7.0,
            daily_steps: 1000.0,
        }
    }

    #[test]
    fn test_raw_inputs_never_trigger_session_rules() {
        let engine = flat_fitness_engine();

        for intensity in ["Low", "Medium", "High"] {
            for duration in [15.0, 90.0] {
                let report = engine
                    .score_raw_inputs(&form_inputs(intensity, duration, 300.0))
                    .unwrap();

                // duration and steps are not request columns, so their defaults apply
                assert!(
                    report.penalties.is_empty(),
                    "{intensity}/{duration}: {:?}",
                    report.penalties
                );
                assert_eq!(report.score, 50.0);
            }
        }
    }

    #[test]
    fn test_long_high_intensity_session_only_pays_calorie_penalty() {
        let engine = flat_fitness_engine();
        let report = engine
            .score_raw_inputs(&form_inputs("High", 90.0, 90.0))
            .unwrap();

        let rules: Vec<&str> = report.penalties.iter().map(|p| p.rule.as_str()).collect();
        assert_eq!(rules, vec!["low_calories"]);
        assert_eq!(report.score, 40.0);
    }

    #[test]
    fn test_evaluate_form_from_sensor_json() {
        let engine = FitlyticsEngine::new();
        let still: Vec<f64> = vec![16384.0; 20];
        let sensor = json!({"az": still, "gx": 0, "gy": "0", "gz": 0, "temp": 31.5});

        let payload: Value = serde_json::from_str(
            &engine
                .evaluate_form_json(Exercise::Plank, &sensor.to_string())
                .unwrap(),
        )
        .unwrap();

        assert_eq!(payload["exercise"], "Plank");
        assert_eq!(payload["band"], "Beast");
        assert_eq!(payload["samples"], 20);

        let short = as_map(json!({"ax": [1.0, 2.0, 3.0]}));
        let eval = evaluate_form(&short, Exercise::JumpingJacks).unwrap();
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn test_demo_artifacts_load_and_run() {
        let engine = FitlyticsEngine::new()
            .with_activity_model(
                ModelArtifact::from_json(include_str!("../demos/data/activity_model.json"))
                    .unwrap(),
            )
            .with_fitness_model(
                ModelArtifact::from_json(include_str!("../demos/data/fitness_model.json"))
                    .unwrap(),
            );

        let sensor = parse_object(include_str!("../demos/data/sensor_window.json")).unwrap();
        let label = engine.classify(&sensor).unwrap();
        assert!((0..=2).contains(&label));

        let inputs =
            RawFitnessInputs::from_json(include_str!("../demos/data/raw_inputs.json")).unwrap();
        let report = engine.score_raw_inputs(&inputs).unwrap();
        assert!((1.0..=100.0).contains(&report.score));

        let window = parse_object(include_str!("../demos/data/form_window.json")).unwrap();
        let form = evaluate_form(&window, Exercise::JumpingJacks).unwrap();
        assert_eq!(form.samples, 20);
        assert!(form.score > 0.0);
    }
}
