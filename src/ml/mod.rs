//! Model artifacts and CPU inference.
//!
//! An artifact is loaded once at startup and shared read-only behind
//! `Arc<dyn Predictor>` for the lifetime of the process.

pub mod dense;
pub mod linear;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use dense::{Activation, DenseLayer, DenseNetwork};
pub use linear::LinearModel;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, ServeError, ValidationError};
use crate::schema::FeatureFrame;

/// A loaded, immutable regression model.
pub trait Predictor: Send + Sync + std::fmt::Debug {
    /// Short artifact kind, e.g. `"linear"`.
    fn kind(&self) -> &'static str;

    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// Column names the model was trained with, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Run inference on one positional row.
    fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>>;

    /// Run inference on a single-row frame.
    ///
    /// Labeled frames must carry exactly the model's feature names, in order.
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        if let (Some(expected), Some(got)) = (self.feature_names(), frame.columns.as_deref()) {
            if expected != got {
                return Err(ValidationError::FeatureNames {
                    expected: expected.to_vec(),
                    got: got.to_vec(),
                }
                .into());
            }
        }
        let out = self.predict_row(&frame.values)?;
        if out.is_empty() {
            return Err(ServeError::Model("model produced no outputs".to_string()));
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ServeError::Model(
                "model produced non-finite output".to_string(),
            ));
        }
        Ok(out)
    }
}

/// JSON model artifact, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Dense(DenseNetwork),
}

impl ModelArtifact {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let artifact: Self = serde_json::from_str(&content).map_err(|e| {
            ServeError::Model(format!(
                "cannot decode model artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        let checked = match self {
            ModelArtifact::Linear(m) => m.validate(),
            ModelArtifact::Dense(m) => m.validate(),
        };
        checked.map_err(|e| ServeError::Model(format!("invalid model artifact: {e}")))
    }

    pub fn into_predictor(self) -> Arc<dyn Predictor> {
        match self {
            ModelArtifact::Linear(m) => Arc::new(m),
            ModelArtifact::Dense(m) => Arc::new(m),
        }
    }
}

/// Load the model at `path`.
///
/// `.onnx` files carry no input width of their own, so `input_dim` must be
/// supplied for them; JSON artifacts ignore it.
pub fn load_model<P: AsRef<Path>>(
    path: P,
    input_dim: Option<usize>,
) -> Result<Arc<dyn Predictor>> {
    let path = path.as_ref();
    let is_onnx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("onnx"));

    if is_onnx {
        return load_onnx(path, input_dim);
    }

    Ok(ModelArtifact::from_file(path)?.into_predictor())
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, input_dim: Option<usize>) -> Result<Arc<dyn Predictor>> {
    let input_dim = input_dim.ok_or_else(|| {
        ServeError::InvalidConfig(
            "onnx artifacts need an input width (schema or model.input_dim)".to_string(),
        )
    })?;
    Ok(Arc::new(OnnxModel::load_for_vec_input(path, input_dim)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _input_dim: Option<usize>) -> Result<Arc<dyn Predictor>> {
    Err(ServeError::InvalidConfig(format!(
        "{} is an onnx artifact but this build lacks the `onnx` feature",
        path.display()
    )))
}
