//! Nearest-centroid classifier
//!
//! Each class is represented by one centroid in feature space. A row is assigned the
//! label of the centroid with the smallest squared Euclidean distance; ties go to the
//! centroid declared first.

use super::{check_row_width, Predictor};
use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Class centroid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Centroid {
    pub label: i64,
    pub center: Vec<f64>,
}

/// Nearest-centroid classifier
#[derive(Debug, Clone)]
pub struct NearestCentroid {
    centroids: Vec<Centroid>,
    width: usize,
}

impl NearestCentroid {
    pub fn new(centroids: Vec<Centroid>, width: usize) -> Result<Self, ComputeError> {
        if centroids.is_empty() {
            return Err(ComputeError::ArtifactError(
                "nearest-centroid model has no centroids".to_string(),
            ));
        }
        if let Some(bad) = centroids.iter().find(|c| c.center.len() != width) {
            return Err(ComputeError::ArtifactError(format!(
                "centroid for label {} has {} dimensions, expected {width}",
                bad.label,
                bad.center.len()
            )));
        }
        Ok(Self { centroids, width })
    }

    fn classify(&self, row: &[f64]) -> i64 {
        let mut best_label = self.centroids[0].label;
        let mut best_distance = f64::INFINITY;

        for centroid in &self.centroids {
            let distance: f64 = centroid
                .center
                .iter()
                .zip(row)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            if distance < best_distance {
                best_distance = distance;
                best_label = centroid.label;
            }
        }

        best_label
    }
}

impl Predictor for NearestCentroid {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ComputeError> {
        rows.iter()
            .map(|row| {
                check_row_width(row, self.width)?;
                Ok(self.classify(row) as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NearestCentroid {
        NearestCentroid::new(
            vec![
                Centroid { label: 0, center: vec![0.0, 0.0] },
                Centroid { label: 1, center: vec![10.0, 0.0] },
                Centroid { label: 2, center: vec![0.0, 10.0] },
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_assigns_closest_label() {
        let out = model()
            .predict(&[vec![1.0, 1.0], vec![9.0, 2.0], vec![-1.0, 8.0]])
            .unwrap();
        assert_eq!(out, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let out = model().predict(&[vec![5.0, 0.0]]).unwrap();
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn test_dimension_checks() {
        let bad = NearestCentroid::new(vec![Centroid { label: 0, center: vec![1.0] }], 2);
        assert!(matches!(bad, Err(ComputeError::ArtifactError(_))));

        let none = NearestCentroid::new(vec![], 2);
        assert!(matches!(none, Err(ComputeError::ArtifactError(_))));

        assert!(matches!(
            model().predict(&[vec![1.0]]),
            Err(ComputeError::ModelInput(_))
        ));
    }
}
