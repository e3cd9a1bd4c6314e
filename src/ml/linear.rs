//! Linear regression: `intercept + coefficients . x`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::ml::Predictor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl LinearModel {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("coefficients must not be empty".to_string());
        }
        if self.coefficients.iter().any(|v| !v.is_finite()) || !self.intercept.is_finite() {
            return Err("coefficients and intercept must be finite".to_string());
        }
        if let Some(names) = &self.feature_names {
            super::dense::check_feature_names(names, self.coefficients.len())?;
        }
        Ok(())
    }
}

impl Predictor for LinearModel {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn input_dim(&self) -> usize {
        self.coefficients.len()
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.coefficients.len() {
            return Err(ValidationError::Dimension {
                expected: self.coefficients.len(),
                got: row.len(),
            }
            .into());
        }
        let y = self
            .coefficients
            .iter()
            .zip(row)
            .fold(self.intercept, |acc, (w, x)| acc + w * x);
        Ok(vec![y])
    }
}
