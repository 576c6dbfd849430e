//! Core types for the Fitlytics pipelines
//!
//! This module defines the data structures that flow through each stage of the
//! activity and fitness pipelines: sensor channels, normalized frames, feature
//! maps and vectors, and the encoded prediction payloads.

use crate::form::FormEvaluation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw sensor channel of the wrist/IMU device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ax,
    Ay,
    Az,
    Gx,
    Gy,
    Gz,
    Temp,
}

impl Channel {
    /// Every channel the normalizer recognises, in catalog order
    pub const ALL: [Channel; 7] = [
        Channel::Ax,
        Channel::Ay,
        Channel::Az,
        Channel::Gx,
        Channel::Gy,
        Channel::Gz,
        Channel::Temp,
    ];

    /// The six motion channels that receive the full per-channel statistics
    pub const MOTION: [Channel; 6] = [
        Channel::Ax,
        Channel::Ay,
        Channel::Az,
        Channel::Gx,
        Channel::Gy,
        Channel::Gz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ax => "ax",
            Channel::Ay => "ay",
            Channel::Az => "az",
            Channel::Gx => "gx",
            Channel::Gy => "gy",
            Channel::Gz => "gz",
            Channel::Temp => "temp",
        }
    }
}

/// Normalized sensor input: every present channel mapped to a non-empty sample sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub channels: BTreeMap<Channel, Vec<f64>>,
}

impl SensorFrame {
    pub fn get(&self, channel: Channel) -> Option<&[f64]> {
        self.channels.get(&channel).map(Vec::as_slice)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Every feature the extractor could compute for a frame, keyed by feature name
pub type FeatureMap = BTreeMap<String, f64>;

/// Feature values laid out in a model's training-time column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.values.get(idx).copied())
    }
}

/// Human-readable band of a calibrated fitness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Low,
    Moderate,
    Excellent,
}

impl ScoreLevel {
    /// Band a score in [1, 100]
    pub fn from_score(score: f64) -> Self {
        if score < 40.0 {
            ScoreLevel::Low
        } else if score < 80.0 {
            ScoreLevel::Moderate
        } else {
            ScoreLevel::Excellent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLevel::Low => "low",
            ScoreLevel::Moderate => "moderate",
            ScoreLevel::Excellent => "excellent",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScoreLevel::Low => "Keep pushing! There's room for improvement.",
            ScoreLevel::Moderate => "Good progress! You're on the right track.",
            ScoreLevel::Excellent => "Outstanding! You're in excellent shape.",
        }
    }
}

/// One penalty that fired during calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPenalty {
    pub rule: String,
    pub delta: f64,
}

/// Full trace of a calibration pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Raw model output
    pub raw: f64,
    /// Logistic-squashed score in (0, 100)
    pub squashed: f64,
    /// Penalties in declared rule order (only non-zero deltas)
    pub penalties: Vec<AppliedPenalty>,
    /// Squashed score plus every penalty, before clamping
    pub accumulated: f64,
    /// Final score in [1, 100], rounded to 2 decimals
    pub score: f64,
    pub level: ScoreLevel,
}

/// Producer metadata attached to every encoded payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded activity classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub payload_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub activity: i64,
    /// Number of sensor channels present in the request
    pub channels_present: usize,
}

/// Encoded fitness score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessPayload {
    pub payload_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub fitness_score: f64,
    pub level: ScoreLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationReport>,
}

/// Encoded exercise form evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPayload {
    pub payload_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    #[serde(flatten)]
    pub form: FormEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_level_bands() {
        assert_eq!(ScoreLevel::from_score(1.0), ScoreLevel::Low);
        assert_eq!(ScoreLevel::from_score(39.99), ScoreLevel::Low);
        assert_eq!(ScoreLevel::from_score(40.0), ScoreLevel::Moderate);
        assert_eq!(ScoreLevel::from_score(79.99), ScoreLevel::Moderate);
        assert_eq!(ScoreLevel::from_score(80.0), ScoreLevel::Excellent);
        assert_eq!(ScoreLevel::from_score(100.0), ScoreLevel::Excellent);
    }

    #[test]
    fn test_channel_serde_names() {
        let json = serde_json::to_string(&Channel::Temp).unwrap();
        assert_eq!(json, "\"temp\"");
        for channel in Channel::ALL {
            let json = serde_json::to_string(&channel).unwrap();
            assert_eq!(json, format!("\"{}\"", channel.as_str()));
        }
    }

    #[test]
    fn test_feature_vector_lookup() {
        let vector = FeatureVector {
            names: vec!["ax_mean".to_string(), "dom_freq".to_string()],
            values: vec![1.5, 0.0],
        };
        assert_eq!(vector.get("ax_mean"), Some(1.5));
        assert_eq!(vector.get("gz_mean"), None);
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn test_feature_vector_lookup_with_short_values() {
        let vector = FeatureVector {
            names: vec!["ax_mean".to_string(), "ay_mean".to_string()],
            values: vec![1.5],
        };
        assert_eq!(vector.get("ax_mean"), Some(1.5));
        assert_eq!(vector.get("ay_mean"), None);
    }
}
