//! Classifier trait: the seam between the prediction pipeline and a model runtime.
//!
//! The pipeline only needs "tensor in, score vector out". Keeping that behind
//! a trait lets the ONNX backend be swapped for an in-memory classifier in
//! tests, or for another runtime later.

use std::sync::Arc;

use ndarray::Array4;

use crate::Result;

/// A pretrained image classifier.
///
/// Implementations must be safe to call from many threads at once. Calls are
/// blocking; async callers run them on the blocking pool.
pub trait Classifier: Send + Sync {
    /// Classifier name for logging/debugging.
    fn name(&self) -> &str;

    /// Run one NHWC batch of a single image and return its score vector.
    ///
    /// Scores are index-aligned with the class table. Whether they are
    /// probabilities or raw logits depends on the exported model.
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

impl<T: Classifier + ?Sized> Classifier for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        (**self).classify(input)
    }
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        (**self).classify(input)
    }
}
