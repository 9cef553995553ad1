//! Model artifacts.
//!
//! The classifier is a pre-trained, opaque artifact. The pipeline only relies on the
//! [`InferenceModel`] shape contract: a `[1, rows, channels]` float input flattened
//! row-major, and one score per class out.
//!
//! [`DenseModel`] is the artifact format this crate can load on its own: a single linear
//! layer stored as JSON. Other runtimes plug in by implementing the trait.

use crate::error::{AppResult, HandednessError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// An inference backend with a fixed input and output shape.
pub trait InferenceModel: Send + Sync {
    /// `(rows, channels)` of one input window.
    fn input_shape(&self) -> (usize, usize);

    /// Number of scores produced per window.
    fn output_len(&self) -> usize;

    /// Score one window.
    ///
    /// `input` holds `rows * channels` values, row-major. Implementations may panic if it
    /// does not; callers are responsible for the shape.
    fn infer(&self, input: &[f32]) -> Vec<f32>;
}

/// A linear classifier: `scores = weights * input + bias`.
///
/// Serialized as:
///
/// ```json
/// {
///   "input_shape": [120, 6],
///   "weights": [[...720 floats...], [...], [...]],
///   "bias": [0.0, 0.0, 0.0]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseModel {
    input_shape: (usize, usize),
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl DenseModel {
    /// Build and validate a model from its parts.
    pub fn new(
        input_shape: (usize, usize),
        weights: Vec<Vec<f32>>,
        bias: Vec<f32>,
    ) -> AppResult<Self> {
        let model = Self {
            input_shape,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a model artifact from a JSON file.
    ///
    /// A missing, unreadable or inconsistent artifact is a configuration error.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| HandednessError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), bytes = text.len(), "Model file read");

        let model: DenseModel =
            serde_json::from_str(&text).map_err(|e| HandednessError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        model.validate()?;

        info!(
            path = %path.display(),
            input_shape = ?model.input_shape,
            classes = model.bias.len(),
            "Model initialized"
        );
        Ok(model)
    }

    /// Write the artifact as JSON.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| HandednessError::ModelFormat(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        let (rows, channels) = self.input_shape;
        let input_len = rows * channels;
        if input_len == 0 {
            return Err(HandednessError::ModelFormat(format!(
                "input shape {:?} has no elements",
                self.input_shape
            )));
        }
        if self.weights.is_empty() {
            return Err(HandednessError::ModelFormat(
                "model has no output classes".into(),
            ));
        }
        if self.weights.len() != self.bias.len() {
            return Err(HandednessError::ModelFormat(format!(
                "{} weight rows but {} bias terms",
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some((class, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != input_len)
        {
            return Err(HandednessError::ModelFormat(format!(
                "weight row {class} has {} columns, expected {input_len}",
                row.len()
            )));
        }
        Ok(())
    }
}

impl InferenceModel for DenseModel {
    fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    fn output_len(&self) -> usize {
        self.bias.len()
    }

    fn infer(&self, input: &[f32]) -> Vec<f32> {
        let (rows, channels) = self.input_shape;
        assert_eq!(
            input.len(),
            rows * channels,
            "model input must be {rows}x{channels}"
        );
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}
