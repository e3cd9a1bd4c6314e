//! ONNX inference wrapper (pure Rust via `tract-onnx`).
//!
//! Serves regressors exported from other toolchains without a Python runtime.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{Result, ServeError, ValidationError};
use crate::ml::Predictor;

#[derive(Clone)]
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    input_dim: usize,
    output_dim: usize,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_dim", &self.input_dim)
            .field("output_dim", &self.output_dim)
            .finish()
    }
}

impl OnnxModel {
    /// Load an ONNX model and specialize it to a fixed `[1, input_dim]` f32 input.
    pub fn load_for_vec_input(path: &Path, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(ServeError::InvalidConfig("input_dim must be > 0".to_string()));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ServeError::Model(format!("onnx load failed: {e}")))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, input_dim)))
            .map_err(|e| ServeError::Model(format!("onnx input fact failed: {e}")))?
            .into_optimized()
            .map_err(|e| ServeError::Model(format!("onnx optimize failed: {e}")))?
            .into_runnable()
            .map_err(|e| ServeError::Model(format!("onnx runnable failed: {e}")))?;

        let mut model = Self {
            plan,
            input_dim,
            output_dim: 0,
        };

        // Infer output_dim by running a dummy forward pass.
        let probe = model.run(&vec![0.0; input_dim])?;
        if probe.is_empty() {
            return Err(ServeError::Model("onnx output has zero elements".to_string()));
        }
        model.output_dim = probe.len();
        Ok(model)
    }

    fn run(&self, input: &[f64]) -> Result<Vec<f64>> {
        let values: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor = tract_ndarray::ArrayD::<f32>::from_shape_vec(
            tract_ndarray::IxDyn(&[1, self.input_dim]),
            values,
        )
        .map_err(|e| ServeError::Model(format!("onnx input reshape failed: {e}")))?
        .into_tvalue();

        let outputs = self
            .plan
            .run(tvec!(tensor))
            .map_err(|e| ServeError::Model(format!("onnx run failed: {e}")))?;
        let first = outputs
            .first()
            .ok_or_else(|| ServeError::Model("onnx produced no outputs".to_string()))?;
        let arr = first
            .to_array_view::<f32>()
            .map_err(|e| ServeError::Model(format!("onnx output decode failed: {e}")))?;

        Ok(arr.iter().map(|v| f64::from(*v)).collect())
    }
}

impl Predictor for OnnxModel {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.input_dim {
            return Err(ValidationError::Dimension {
                expected: self.input_dim,
                got: row.len(),
            }
            .into());
        }
        self.run(row)
    }
}
