//! Prediction result and wire response types

use serde::{Deserialize, Serialize};

use crate::FruitscanError;

/// Top-1 prediction for one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fruit: String,
    /// Condition of the leaf (disease name or "Healthy").
    pub class: String,
    /// Probability of the predicted class, in percent (`0.0..=100.0`).
    pub confidence: f64,
}

/// Body of a `/predict` response.
///
/// Serializes as either `{"fruit", "class", "confidence"}` or `{"error"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Prediction(Prediction),
    Error { error: String },
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self::Prediction(prediction)
    }
}

impl From<&FruitscanError> for PredictResponse {
    fn from(err: &FruitscanError) -> Self {
        Self::Error {
            error: err.to_string(),
        }
    }
}
