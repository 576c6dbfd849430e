//! Feature extraction
//!
//! This module derives the statistical feature catalog from a normalized sensor frame:
//! - Per motion channel: mean, std, min, max, skew, kurt, energy
//! - Acceleration magnitude: mean, std, energy (needs all three axes)
//! - Temperature: mean, std
//! - Dominant frequency placeholder
//!
//! The catalog may over-produce. [`FeatureExtractor::select`] lays it out in the exact
//! column order a model was trained on.

use crate::error::ComputeError;
use crate::types::{Channel, FeatureMap, FeatureVector, SensorFrame};

/// Name of the dominant-frequency feature.
///
/// No spectral analysis is performed, so this is always 0. Models trained against the
/// same extractor saw the same constant.
pub const DOMINANT_FREQUENCY: &str = "dom_freq";

/// Value used for any requested feature the catalog could not compute
pub const MISSING_FEATURE_VALUE: f64 = 0.0;

/// Feature extractor for sensor frames
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Compute every feature available from the channels present in `frame`
    pub fn extract(frame: &SensorFrame) -> Result<FeatureMap, ComputeError> {
        let mut features = FeatureMap::new();

        for channel in Channel::MOTION {
            if let Some(samples) = frame.get(channel) {
                insert_channel_stats(&mut features, channel.as_str(), samples);
            }
        }

        if let Some(magnitude) = acceleration_magnitude(frame)? {
            features.insert("acc_mag_mean".to_string(), mean(&magnitude));
            features.insert("acc_mag_std".to_string(), std_dev(&magnitude));
            features.insert("acc_mag_energy".to_string(), energy(&magnitude));
        }

        features.insert(DOMINANT_FREQUENCY.to_string(), 0.0);

        if let Some(temp) = frame.get(Channel::Temp) {
            features.insert("temp_mean".to_string(), mean(temp));
            features.insert("temp_std".to_string(), std_dev(temp));
        }

        tracing::debug!(features = features.len(), "extracted feature catalog");

        Ok(features)
    }

    /// Lay out `features` in the order given by `names`, filling unknown names with 0
    pub fn select(features: &FeatureMap, names: &[String]) -> FeatureVector {
        let values = names
            .iter()
            .map(|name| {
                features
                    .get(name)
                    .copied()
                    .unwrap_or(MISSING_FEATURE_VALUE)
            })
            .collect();

        FeatureVector {
            names: names.to_vec(),
            values,
        }
    }

    /// Extract and select in one step
    pub fn extract_vector(
        frame: &SensorFrame,
        names: &[String],
    ) -> Result<FeatureVector, ComputeError> {
        let features = Self::extract(frame)?;
        Ok(Self::select(&features, names))
    }
}

fn insert_channel_stats(features: &mut FeatureMap, prefix: &str, samples: &[f64]) {
    let (skew, kurt) = if samples.len() > 1 {
        (skewness(samples), kurtosis(samples))
    } else {
        (0.0, 0.0)
    };

    features.insert(format!("{prefix}_mean"), mean(samples));
    features.insert(format!("{prefix}_std"), std_dev(samples));
    features.insert(format!("{prefix}_min"), min(samples));
    features.insert(format!("{prefix}_max"), max(samples));
    features.insert(format!("{prefix}_skew"), skew);
    features.insert(format!("{prefix}_kurt"), kurt);
    features.insert(format!("{prefix}_energy"), energy(samples));
}

/// Per-sample acceleration magnitude, or `None` unless all three axes are present
fn acceleration_magnitude(frame: &SensorFrame) -> Result<Option<Vec<f64>>, ComputeError> {
    let (Some(ax), Some(ay), Some(az)) = (
        frame.get(Channel::Ax),
        frame.get(Channel::Ay),
        frame.get(Channel::Az),
    ) else {
        return Ok(None);
    };

    let len = ax.len().max(ay.len()).max(az.len());
    vector_magnitude([("ax", ax), ("ay", ay), ("az", az)], len).map(Some)
}

/// Per-sample Euclidean norm of three axes over a window of `len` samples.
///
/// A single-sample axis is broadcast across the window; any other length mismatch
/// cannot be aligned and is rejected.
pub(crate) fn vector_magnitude(
    axes: [(&str, &[f64]); 3],
    len: usize,
) -> Result<Vec<f64>, ComputeError> {
    for (name, axis) in axes {
        if axis.len() != len && axis.len() != 1 {
            return Err(ComputeError::Validation(format!(
                "channel '{name}' has {} samples, expected {len} or 1",
                axis.len()
            )));
        }
    }

    let at = |axis: &[f64], i: usize| if axis.len() == 1 { axis[0] } else { axis[i] };
    let [(_, x), (_, y), (_, z)] = axes;

    Ok((0..len)
        .map(|i| {
            let (x, y, z) = (at(x, i), at(y, i), at(z, i));
            (x * x + y * y + z * z).sqrt()
        })
        .collect())
}

pub(crate) fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Central moment of order `k` (biased, divides by n)
pub(crate) fn central_moment(samples: &[f64], k: i32) -> f64 {
    let mu = mean(samples);
    samples.iter().map(|x| (x - mu).powi(k)).sum::<f64>() / samples.len() as f64
}

/// Population standard deviation
fn std_dev(samples: &[f64]) -> f64 {
    central_moment(samples, 2).sqrt()
}

pub(crate) fn min(samples: &[f64]) -> f64 {
    samples.iter().copied().fold(f64::INFINITY, f64::min)
}

pub(crate) fn max(samples: &[f64]) -> f64 {
    samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Sum of squares
fn energy(samples: &[f64]) -> f64 {
    samples.iter().map(|x| x * x).sum()
}

/// Relative resolution below which a window's variance counts as zero
const VARIANCE_RESOLUTION: f64 = 1e-15;

/// Whether `m2` is indistinguishable from zero at the scale of the samples.
///
/// The threshold follows the magnitude of the mean, so small-unit signals (rad/s,
/// normalized readings) keep their shape moments.
fn is_degenerate(samples: &[f64], m2: f64) -> bool {
    m2 <= (VARIANCE_RESOLUTION * mean(samples)).powi(2)
}

/// Biased sample skewness: `m3 / m2^1.5`
///
/// Zero-variance windows have no defined skew; 0 is returned.
fn skewness(samples: &[f64]) -> f64 {
    let m2 = central_moment(samples, 2);
    if is_degenerate(samples, m2) {
        tracing::warn!(samples = samples.len(), "zero-variance window, skew set to 0");
        return 0.0;
    }
    central_moment(samples, 3) / m2.powf(1.5)
}

/// Fisher (excess) kurtosis: `m4 / m2^2 - 3`
///
/// Zero-variance windows have no defined kurtosis; 0 is returned.
fn kurtosis(samples: &[f64]) -> f64 {
    let m2 = central_moment(samples, 2);
    if is_degenerate(samples, m2) {
        return 0.0;
    }
    central_moment(samples, 4) / (m2 * m2) - 3.0
}
