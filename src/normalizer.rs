//! Sample normalization
//!
//! This module coerces heterogeneous sensor input into uniform per-channel sequences:
//! - A single reading is wrapped into a one-element sequence
//! - Absent channels stay absent, unknown keys are ignored
//! - Non-numeric values are rejected here, before any statistics run

use crate::error::ComputeError;
use crate::types::{Channel, SensorFrame};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Normalizer for converting raw sensor JSON into a [`SensorFrame`]
pub struct Normalizer;

impl Normalizer {
    /// Normalize a raw sensor object such as `{"ax": 120, "ay": [-30, -31]}`
    pub fn normalize(raw: &Map<String, Value>) -> Result<SensorFrame, ComputeError> {
        let mut channels = BTreeMap::new();

        for channel in Channel::ALL {
            let Some(value) = raw.get(channel.as_str()) else {
                continue;
            };
            let samples = coerce_samples(channel.as_str(), value)?;
            channels.insert(channel, samples);
        }

        tracing::debug!(channels = channels.len(), "normalized sensor frame");

        Ok(SensorFrame { channels })
    }

    /// Parse and normalize a JSON document that must be an object
    pub fn normalize_json(raw_json: &str) -> Result<SensorFrame, ComputeError> {
        let value: Value = serde_json::from_str(raw_json)?;
        match value {
            Value::Object(map) => Self::normalize(&map),
            other => Err(ComputeError::Validation(format!(
                "sensor payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Coerce a scalar-or-sequence value into a non-empty sample sequence
fn coerce_samples(field: &str, value: &Value) -> Result<Vec<f64>, ComputeError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ComputeError::Validation(format!(
                    "channel '{field}' has no samples"
                )));
            }
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| coerce_number(&format!("{field}[{idx}]"), item))
                .collect()
        }
        scalar => Ok(vec![coerce_number(field, scalar)?]),
    }
}

/// Coerce a single JSON value into a finite `f64`
///
/// Accepts numbers and numeric strings. Booleans, null, arrays and objects are rejected.
pub fn coerce_number(field: &str, value: &Value) -> Result<f64, ComputeError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(ComputeError::Validation(format!(
            "field '{field}' is not a finite number"
        ))),
        None => Err(ComputeError::Validation(format!(
            "field '{field}' must be numeric, got {}",
            json_kind(value)
        ))),
    }
}

/// Short name of a JSON value's type for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_scalar_wrapped_into_sequence() {
        let frame = Normalizer::normalize(&as_map(json!({"ax": 120, "temp": 25.5}))).unwrap();

        assert_eq!(frame.get(Channel::Ax), Some(&[120.0][..]));
        assert_eq!(frame.get(Channel::Temp), Some(&[25.5][..]));
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_sequence_kept_in_order() {
        let frame = Normalizer::normalize(&as_map(json!({"gy": [1, -2.5, 3]}))).unwrap();
        assert_eq!(frame.get(Channel::Gy), Some(&[1.0, -2.5, 3.0][..]));
    }

    #[test]
    fn test_absent_and_unknown_channels() {
        let frame =
            Normalizer::normalize(&as_map(json!({"az": 980, "pressure": 1013}))).unwrap();

        assert!(frame.contains(Channel::Az));
        assert!(!frame.contains(Channel::Ax));
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let frame = Normalizer::normalize(&as_map(json!({"gx": "10", "gz": [" -1.5 "]}))).unwrap();
        assert_eq!(frame.get(Channel::Gx), Some(&[10.0][..]));
        assert_eq!(frame.get(Channel::Gz), Some(&[-1.5][..]));
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        for bad in [
            json!({"ax": "fast"}),
            json!({"ax": true}),
            json!({"ax": null}),
            json!({"ax": [1, {"v": 2}]}),
            json!({"ax": [[1, 2]]}),
            json!({"ax": []}),
            json!({"ax": "NaN"}),
        ] {
            let result = Normalizer::normalize(&as_map(bad.clone()));
            assert!(
                matches!(result, Err(ComputeError::Validation(_))),
                "expected validation error for {bad}"
            );
        }
    }

    #[test]
    fn test_normalize_json_requires_object() {
        assert!(matches!(
            Normalizer::normalize_json("[1, 2, 3]"),
            Err(ComputeError::Validation(_))
        ));
        assert!(matches!(
            Normalizer::normalize_json("not json"),
            Err(ComputeError::JsonError(_))
        ));
    }
}
