//! Prediction encoding
//!
//! This module wraps pipeline results into JSON payloads carrying producer metadata.
//! The `activity` and `fitness_score` keys keep the shape of the plain service
//! responses, so existing clients can read the payloads unchanged.

use crate::error::ComputeError;
use crate::form::FormEvaluation;
use crate::types::{ActivityPayload, CalibrationReport, FitnessPayload, FormPayload, Producer};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current payload schema version
pub const PAYLOAD_VERSION: &str = "1.0.0";

/// Encoder for prediction payloads
pub struct PredictionEncoder {
    instance_id: String,
    include_calibration: bool,
}

impl Default for PredictionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            include_calibration: false,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            include_calibration: false,
        }
    }

    /// Attach the full calibration trace to fitness payloads
    pub fn include_calibration(mut self, include: bool) -> Self {
        self.include_calibration = include;
        self
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Encode an activity label
    pub fn encode_activity(&self, activity: i64, channels_present: usize) -> ActivityPayload {
        ActivityPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            activity,
            channels_present,
        }
    }

    /// Encode a calibrated fitness score
    pub fn encode_fitness(&self, report: &CalibrationReport) -> FitnessPayload {
        FitnessPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            fitness_score: report.score,
            level: report.level,
            message: report.level.message().to_string(),
            calibration: self.include_calibration.then(|| report.clone()),
        }
    }

    /// Encode an exercise form evaluation
    pub fn encode_form(&self, form: &FormEvaluation) -> FormPayload {
        FormPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            form: form.clone(),
        }
    }

    /// Encode an activity label to a JSON string
    pub fn activity_to_json(
        &self,
        activity: i64,
        channels_present: usize,
    ) -> Result<String, ComputeError> {
        let payload = self.encode_activity(activity, channels_present);
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }

    /// Encode a fitness report to a JSON string
    pub fn fitness_to_json(&self, report: &CalibrationReport) -> Result<String, ComputeError> {
        let payload = self.encode_fitness(report);
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }

    /// Encode a form evaluation to a JSON string
    pub fn form_to_json(&self, form: &FormEvaluation) -> Result<String, ComputeError> {
        let payload = self.encode_form(form);
        serde_json::to_string(&payload).map_err(ComputeError::JsonError)
    }
}
