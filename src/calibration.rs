//! Score calibration
//!
//! Reshapes a raw regression output into a stable 1-100 fitness score:
//! 1. Logistic squash centred at 55
//! 2. Ordered, additive penalty rules read from the original request fields
//! 3. Clamp to [1, 100]
//! 4. Round to 2 decimals

use crate::error::ComputeError;
use crate::normalizer::coerce_number;
use crate::types::{AppliedPenalty, CalibrationReport, ScoreLevel};
use serde_json::{Map, Value};

/// Midpoint of the logistic squash
pub const SQUASH_CENTER: f64 = 55.0;

/// Steepness of the logistic squash
pub const SQUASH_SHARPNESS: f64 = 0.07;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 100.0;

/// Map an unbounded raw score into (0, 100), monotonically
pub fn squash(raw: f64) -> f64 {
    100.0 / (1.0 + (-SQUASH_SHARPNESS * (raw - SQUASH_CENTER)).exp())
}

/// Auxiliary request fields read by the penalty rules, defaults applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxInputs {
    pub duration_minutes: f64,
    pub daily_steps: f64,
    pub calories_burned: f64,
    pub intensity: f64,
    pub hours_sleep: f64,
    pub resting_heart_rate: f64,
    pub bmi: f64,
}

impl Default for AuxInputs {
    fn default() -> Self {
        Self {
            duration_minutes: 30.0,
            daily_steps: 8000.0,
            calories_burned: 50.0,
            intensity: 1.0,
            hours_sleep: 7.0,
            resting_heart_rate: 70.0,
            bmi: 22.0,
        }
    }
}

impl AuxInputs {
    /// Read the auxiliary fields from a request; absent fields take their defaults
    pub fn from_map(request: &Map<String, Value>) -> Result<Self, ComputeError> {
        let defaults = Self::default();
        let field = |name: &str, default: f64| match request.get(name) {
            Some(value) => coerce_number(name, value),
            None => Ok(default),
        };

        Ok(Self {
            duration_minutes: field("duration_minutes", defaults.duration_minutes)?,
            daily_steps: field("daily_steps", defaults.daily_steps)?,
            calories_burned: field("calories_burned", defaults.calories_burned)?,
            intensity: field("intensity", defaults.intensity)?,
            hours_sleep: field("hours_sleep", defaults.hours_sleep)?,
            resting_heart_rate: field("resting_heart_rate", defaults.resting_heart_rate)?,
            bmi: field("bmi", defaults.bmi)?,
        })
    }
}

/// One tier of a penalty rule: when `applies` holds, `delta` is added
#[derive(Clone, Copy)]
pub struct PenaltyTier {
    pub applies: fn(&AuxInputs) -> bool,
    pub delta: f64,
}

/// A named penalty rule. Tiers are mutually exclusive: the first matching tier wins.
#[derive(Clone, Copy)]
pub struct PenaltyRule {
    pub name: &'static str,
    pub tiers: &'static [PenaltyTier],
}

impl PenaltyRule {
    /// Adjustment this rule contributes (0 when no tier applies)
    pub fn evaluate(&self, aux: &AuxInputs) -> f64 {
        self.tiers
            .iter()
            .find(|tier| (tier.applies)(aux))
            .map_or(0.0, |tier| tier.delta)
    }
}

/// Penalty rules in evaluation order
pub const PENALTY_RULES: &[PenaltyRule] = &[
    PenaltyRule {
        name: "short_duration",
        tiers: &[PenaltyTier {
            applies: |a| a.duration_minutes < 20.0,
            delta: -8.0,
        }],
    },
    PenaltyRule {
        name: "low_daily_steps",
        tiers: &[PenaltyTier {
            applies: |a| a.daily_steps < 2000.0,
            delta: -12.0,
        }],
    },
    PenaltyRule {
        name: "low_calories",
        tiers: &[PenaltyTier {
            applies: |a| a.calories_burned < 120.0,
            delta: -10.0,
        }],
    },
    PenaltyRule {
        name: "high_intensity_short_session",
        tiers: &[PenaltyTier {
            applies: |a| a.intensity >= 4.0 && a.duration_minutes < 30.0,
            delta: -14.0,
        }],
    },
    PenaltyRule {
        name: "low_intensity_long_session",
        tiers: &[PenaltyTier {
            applies: |a| a.intensity <= 2.0 && a.duration_minutes > 60.0,
            delta: -10.0,
        }],
    },
    PenaltyRule {
        name: "sleep_deficit",
        tiers: &[
            PenaltyTier {
                applies: |a| a.hours_sleep < 4.0,
                delta: -20.0,
            },
            PenaltyTier {
                applies: |a| a.hours_sleep < 6.0,
                delta: -12.0,
            },
        ],
    },
    PenaltyRule {
        name: "elevated_resting_heart_rate",
        tiers: &[
            PenaltyTier {
                applies: |a| a.resting_heart_rate > 95.0,
                delta: -20.0,
            },
            PenaltyTier {
                applies: |a| a.resting_heart_rate > 85.0,
                delta: -6.0,
            },
        ],
    },
    PenaltyRule {
        name: "bmi_out_of_range",
        tiers: &[PenaltyTier {
            applies: |a| a.bmi > 30.0 || a.bmi < 17.0,
            delta: -12.0,
        }],
    },
];

/// Calibrate a raw prediction against the request it was made for
pub fn calibrate(raw: f64, request: &Map<String, Value>) -> Result<CalibrationReport, ComputeError> {
    if raw.is_nan() {
        return Err(ComputeError::Validation(
            "raw prediction is NaN".to_string(),
        ));
    }

    let aux = AuxInputs::from_map(request)?;
    Ok(calibrate_with(raw, &aux))
}

/// Calibrate and return only the final score
pub fn calibrate_score(raw: f64, request: &Map<String, Value>) -> Result<f64, ComputeError> {
    calibrate(raw, request).map(|report| report.score)
}

/// Calibrate against already-resolved auxiliary inputs
pub fn calibrate_with(raw: f64, aux: &AuxInputs) -> CalibrationReport {
    let squashed = squash(raw);

    let penalties: Vec<AppliedPenalty> = PENALTY_RULES
        .iter()
        .filter_map(|rule| {
            let delta = rule.evaluate(aux);
            (delta != 0.0).then(|| AppliedPenalty {
                rule: rule.name.to_string(),
                delta,
            })
        })
        .collect();

    let accumulated = squashed + penalties.iter().map(|p| p.delta).sum::<f64>();
    let score = round2(accumulated.min(MAX_SCORE).max(MIN_SCORE));

    tracing::debug!(
        raw,
        squashed,
        penalties = penalties.len(),
        score,
        "calibrated fitness score"
    );

    CalibrationReport {
        raw,
        squashed,
        penalties,
        accumulated,
        score,
        level: ScoreLevel::from_score(score),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
