//! Exercise form evaluation
//!
//! Rule-based scoring of a short IMU window recorded during a guided exercise. The
//! window is reduced to per-sample acceleration and rotation magnitudes, from which
//! three measurements are taken:
//! - Range of motion: spread of the acceleration magnitude
//! - Stability: `1 / (1 + log10(1 + var(rotation magnitude)))`
//! - Tempo: consistency of the spacing between acceleration peaks
//!
//! Each exercise weighs its own mix of these (and of rotation intensity) into a
//! 0-100 score. Thresholds are in raw MPU6050 sensor units.

use crate::error::ComputeError;
use crate::features::{central_moment, max, mean, min, vector_magnitude};
use crate::types::{Channel, SensorFrame};
use serde::{Deserialize, Serialize};

/// Windows shorter than this are scored `Bad` without evaluation
pub const MIN_FORM_SAMPLES: usize = 15;

/// Score at or above which a window is `Good`
pub const GOOD_THRESHOLD: f64 = 40.0;

/// Score at or above which a window is `Beast`
pub const BEAST_THRESHOLD: f64 = 70.0;

/// Tempo reported when fewer than two peaks are found
const SPARSE_PEAK_TEMPO: f64 = 0.3;

const ZERO: [f64; 1] = [0.0];

/// Guided exercise whose form is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exercise {
    #[serde(rename = "Jumping Jacks")]
    JumpingJacks,
    #[serde(rename = "Shadow Boxing")]
    ShadowBoxing,
    #[serde(rename = "Arm Raises")]
    ArmRaises,
    Plank,
}

impl Exercise {
    pub const ALL: [Exercise; 4] = [
        Exercise::JumpingJacks,
        Exercise::ShadowBoxing,
        Exercise::ArmRaises,
        Exercise::Plank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exercise::JumpingJacks => "Jumping Jacks",
            Exercise::ShadowBoxing => "Shadow Boxing",
            Exercise::ArmRaises => "Arm Raises",
            Exercise::Plank => "Plank",
        }
    }

    /// Parse a display label such as `"Arm Raises"`
    pub fn from_label(label: &str) -> Result<Self, ComputeError> {
        Self::ALL
            .into_iter()
            .find(|exercise| exercise.as_str() == label)
            .ok_or_else(|| {
                ComputeError::Validation(format!(
                    "unknown exercise '{label}', expected one of: {}",
                    Self::ALL.map(|e| e.as_str()).join(", ")
                ))
            })
    }
}

/// Band of a form score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormBand {
    Bad,
    Good,
    Beast,
}

impl FormBand {
    pub fn from_score(score: f64) -> Self {
        if score < GOOD_THRESHOLD {
            FormBand::Bad
        } else if score < BEAST_THRESHOLD {
            FormBand::Good
        } else {
            FormBand::Beast
        }
    }
}

/// Result of evaluating one exercise window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEvaluation {
    pub exercise: Exercise,
    pub band: FormBand,
    pub score: f64,
    pub rom: f64,
    pub stability: f64,
    pub tempo: f64,
    pub samples: usize,
}

/// Per-sample magnitudes of one window
struct Motion {
    acc: Vec<f64>,
    gyro: Vec<f64>,
}

/// Form evaluator for exercise windows
pub struct FormEvaluator;

impl FormEvaluator {
    /// Score `frame` as a window of `exercise`.
    ///
    /// Missing motion channels read as 0. Channels must share one length, except
    /// single-sample channels which are held constant across the window.
    pub fn evaluate(
        exercise: Exercise,
        frame: &SensorFrame,
    ) -> Result<FormEvaluation, ComputeError> {
        let samples = Channel::MOTION
            .iter()
            .filter_map(|&channel| frame.get(channel).map(<[f64]>::len))
            .max()
            .unwrap_or(0);

        if samples < MIN_FORM_SAMPLES {
            tracing::debug!(samples, "window too short for form evaluation");
            return Ok(FormEvaluation {
                exercise,
                band: FormBand::Bad,
                score: 0.0,
                rom: 0.0,
                stability: 0.0,
                tempo: 0.0,
                samples,
            });
        }

        let motion = Motion::from_frame(frame, samples)?;
        let rom = range_of_motion(&motion.acc);
        let stability = stability(&motion.gyro);
        let tempo = tempo(&motion.acc);

        let score = match exercise {
            Exercise::JumpingJacks => {
                let rom_score = scale(rom, 11682.0, 30358.0);
                0.4 * rom_score + 0.4 * (stability * 70.0) + 0.2 * (tempo * 100.0)
            }
            Exercise::ShadowBoxing => {
                let gyro_score = scale(mean(&motion.gyro), 20000.0, 47283.0);
                let peak_score = scale(max(&motion.gyro), 30000.0, 56023.0);
                let rom_score = scale(rom, 15000.0, 34360.0);
                0.4 * gyro_score + 0.3 * peak_score + 0.3 * rom_score
            }
            Exercise::ArmRaises => {
                let rom_score = scale(rom, 10000.0, 31199.0);
                let smoothness = scale(20000.0 - variance(&motion.gyro), 0.0, 20000.0);
                0.4 * rom_score + 0.4 * smoothness + 0.2 * (tempo * 100.0)
            }
            Exercise::Plank => {
                let steadiness = scale(10000.0 - mean(&motion.gyro), 0.0, 10000.0);
                let shaking = scale(50000.0 - variance(&motion.gyro), 0.0, 50000.0);
                let body = scale(10000.0 - variance(&motion.acc), 0.0, 10000.0);
                0.5 * steadiness + 0.3 * shaking + 0.2 * body
            }
        };

        Ok(FormEvaluation {
            exercise,
            band: FormBand::from_score(score),
            score,
            rom,
            stability,
            tempo,
            samples,
        })
    }
}

impl Motion {
    fn from_frame(frame: &SensorFrame, samples: usize) -> Result<Self, ComputeError> {
        let axis = |channel: Channel| (channel.as_str(), frame.get(channel).unwrap_or(&ZERO));

        Ok(Self {
            acc: vector_magnitude(
                [axis(Channel::Ax), axis(Channel::Ay), axis(Channel::Az)],
                samples,
            )?,
            gyro: vector_magnitude(
                [axis(Channel::Gx), axis(Channel::Gy), axis(Channel::Gz)],
                samples,
            )?,
        })
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    central_moment(values, 2)
}

/// Linear map of `value` from `[low, high]` onto `[0, 100]`, clamped
fn scale(value: f64, low: f64, high: f64) -> f64 {
    if high == low {
        return 50.0;
    }
    ((value - low) / (high - low) * 100.0).clamp(0.0, 100.0)
}

fn range_of_motion(acc: &[f64]) -> f64 {
    if acc.is_empty() {
        return 0.0;
    }
    max(acc) - min(acc)
}

fn stability(gyro: &[f64]) -> f64 {
    if gyro.is_empty() {
        return 0.0;
    }
    1.0 / (1.0 + (1.0 + variance(gyro)).log10())
}

/// Indices of samples strictly greater than their two neighbours on each side
fn peaks(values: &[f64]) -> Vec<usize> {
    (2..values.len().saturating_sub(2))
        .filter(|&i| {
            let v = values[i];
            v > values[i - 2] && v > values[i - 1] && v > values[i + 1] && v > values[i + 2]
        })
        .collect()
}

/// Rhythm consistency in (0, 1]: `1 / (1 + var(peak spacing) / 10)`
fn tempo(acc: &[f64]) -> f64 {
    if acc.len() < 5 {
        return 0.0;
    }

    let peaks = peaks(acc);
    if peaks.len() < 2 {
        return SPARSE_PEAK_TEMPO;
    }

    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    1.0 / (1.0 + variance(&intervals) / 10.0)
}
