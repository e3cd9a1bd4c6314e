use serde::{Deserialize, Serialize};

use crate::ml::Predictor;

// ============================================================================
// Prediction Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Vec<f64>,
}

// ============================================================================
// Health Check Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub layout: String,
    pub model: ModelSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub kind: String,
    pub input_dim: usize,
    pub output_dim: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl ModelSummary {
    pub fn of(model: &dyn Predictor) -> Self {
        Self {
            kind: model.kind().to_string(),
            input_dim: model.input_dim(),
            output_dim: model.output_dim(),
            feature_names: model.feature_names().map(|n| n.to_vec()),
        }
    }
}
