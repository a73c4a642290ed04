//! Multinomial logistic-regression classifier stage.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Softmax over one linear score per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// One coefficient row per class.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearClassifier {
    pub fn n_classes(&self) -> usize {
        self.intercepts.len()
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() || self.coefficients.len() != self.intercepts.len() {
            return Err(ModelError::Malformed(format!(
                "{} coefficient rows for {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        let width = self.n_features();
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err(ModelError::Malformed(
                "coefficient rows have different widths".to_string(),
            ));
        }
        if self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::Malformed("non-finite coefficient".to_string()));
        }
        Ok(())
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coef, b)| coef.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }
}
