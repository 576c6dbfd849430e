//! Fitness request preparation
//!
//! Turns raw form inputs (categorical labels and plain measurements) into the
//! engineered column set the fitness regressor was trained on:
//! - Ordinal encoding of gender, activity type and intensity
//! - Rate and ratio features derived from duration, heart rate, sleep and age
//! - Advisory range checks against the training data envelope

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Gender labels in encoding order
pub const GENDER_OPTIONS: [&str; 3] = ["Male", "Female", "Other"];

/// Activity labels in encoding order
pub const ACTIVITY_TYPE_OPTIONS: [&str; 10] = [
    "Dancing",
    "Swimming",
    "Weight Training",
    "HIIT",
    "Running",
    "Walking",
    "Tennis",
    "Basketball",
    "Yoga",
    "Cycling",
];

/// Intensity labels in encoding order
pub const INTENSITY_OPTIONS: [&str; 3] = ["Low", "Medium", "High"];

/// Raw fitness form inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFitnessInputs {
    pub calories_burned: f64,
    pub duration_minutes: f64,
    pub resting_heart_rate: f64,
    pub gender: String,
    pub age: f64,
    pub activity_type: String,
    pub bmi: f64,
    pub intensity: String,
    pub hours_sleep: f64,
    pub daily_steps: f64,
}

/// Inclusive range a raw input is expected to fall in
#[derive(Clone, Copy)]
pub struct NumericRange {
    pub field: &'static str,
    pub value: fn(&RawFitnessInputs) -> f64,
    pub min: f64,
    pub max: f64,
}

/// Training-data envelope for the checked inputs
pub const NUMERIC_RANGES: [NumericRange; 3] = [
    NumericRange {
        field: "calories_burned",
        value: |inputs| inputs.calories_burned,
        min: 1.0,
        max: 100.0,
    },
    NumericRange {
        field: "duration_minutes",
        value: |inputs| inputs.duration_minutes,
        min: 1.0,
        max: 120.0,
    },
    NumericRange {
        field: "daily_steps",
        value: |inputs| inputs.daily_steps,
        min: 0.0,
        max: 30000.0,
    },
];

/// Ordinal code of `label` within `options`
fn encode(field: &str, label: &str, options: &[&str]) -> Result<f64, ComputeError> {
    options
        .iter()
        .position(|option| *option == label)
        .map(|idx| idx as f64)
        .ok_or_else(|| {
            ComputeError::Validation(format!(
                "invalid {field} '{label}', expected one of: {}",
                options.join(", ")
            ))
        })
}

impl RawFitnessInputs {
    /// Parse raw inputs from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let inputs: Self = serde_json::from_str(json)?;
        inputs.check_finite()?;
        Ok(inputs)
    }

    fn check_finite(&self) -> Result<(), ComputeError> {
        let fields = [
            ("calories_burned", self.calories_burned),
            ("duration_minutes", self.duration_minutes),
            ("resting_heart_rate", self.resting_heart_rate),
            ("age", self.age),
            ("bmi", self.bmi),
            ("hours_sleep", self.hours_sleep),
            ("daily_steps", self.daily_steps),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(ComputeError::Validation(format!(
                "field '{name}' is not a finite number"
            ))),
            None => Ok(()),
        }
    }

    /// Messages for every checked input outside its training range (empty when all fit)
    pub fn range_warnings(&self) -> Vec<String> {
        NUMERIC_RANGES
            .iter()
            .filter_map(|range| {
                let value = (range.value)(self);
                (value < range.min || value > range.max).then(|| {
                    format!(
                        "{} must be between {} and {}",
                        range.field, range.min, range.max
                    )
                })
            })
            .collect()
    }

    /// Build the engineered request row
    ///
    /// The row holds exactly the 15 model columns. Duration and step count only reach
    /// the regressor through the rate features, so calibration scores them at their
    /// defaults.
    pub fn engineer(&self) -> Result<Map<String, Value>, ComputeError> {
        let gender = encode("gender", &self.gender, &GENDER_OPTIONS)?;
        let activity_type = encode("activity_type", &self.activity_type, &ACTIVITY_TYPE_OPTIONS)?;
        let intensity = encode("intensity", &self.intensity, &INTENSITY_OPTIONS)?;

        let duration = self.duration_minutes;
        let calories = self.calories_burned;
        let rhr = self.resting_heart_rate;

        let columns = [
            ("age", self.age),
            ("gender", gender),
            ("activity_type", activity_type),
            ("intensity", intensity),
            ("calories_burned", calories),
            ("hours_sleep", self.hours_sleep),
            ("bmi", self.bmi),
            ("resting_heart_rate", rhr),
            ("steps_per_min", self.daily_steps / (duration + 1.0)),
            ("calories_per_min", calories / (duration + 1.0)),
            ("hr_efficiency", calories / (rhr + 1.0)),
            ("recovery_score", self.hours_sleep / (rhr + 1.0)),
            ("workload", intensity * duration),
            ("activity_calorie_score", calories * intensity),
            ("age_adjusted_calories", calories / (self.age + 1.0)),
        ];

        Ok(columns
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect())
    }
}
