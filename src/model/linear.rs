//! Linear regression predictor

use super::{check_row_width, Predictor};
use crate::error::ComputeError;

/// `intercept + Σ weight_i * x_i`
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Build a model whose weight count must equal `width`
    pub fn new(weights: Vec<f64>, intercept: f64, width: usize) -> Result<Self, ComputeError> {
        if weights.len() != width {
            return Err(ComputeError::ArtifactError(format!(
                "linear model has {} weights for {width} features",
                weights.len()
            )));
        }
        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(ComputeError::ArtifactError(
                "linear model parameters must be finite".to_string(),
            ));
        }
        Ok(Self { weights, intercept })
    }
}

impl Predictor for LinearModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
        rows.iter()
            .map(|row| {
                check_row_width(row, self.weights.len())?;
                Ok(self.intercept
                    + row
                        .iter()
                        .zip(&self.weights)
                        .map(|(x, w)| x * w)
                        .sum::<f64>())
            })
            .collect()
    }
}
