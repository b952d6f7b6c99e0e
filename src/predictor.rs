//! The prediction pipeline.
//!
//! ```text
//! bytes ──► decode ──► resize 256×256 ──► NHWC [1,256,256,3] ──► classifier
//!                                                                    │
//!        Prediction { fruit, class, confidence% } ◄── argmax ◄── scores
//! ```
//!
//! A [`Predictor`] pairs a classifier with the class table it was trained
//! against. It is built once at startup, shared read-only across requests and
//! never mutated afterwards.

use std::sync::Arc;
use std::time::Instant;

use ndarray::Array4;
use tracing::{debug, instrument};

use crate::model::Classifier;
use crate::preprocess::Preprocessor;
use crate::telemetry;
use crate::types::{ClassTable, Prediction};
use crate::{FruitscanError, Result};

/// Classifier plus the labels and preprocessing it expects.
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
    labels: ClassTable,
    preprocessor: Preprocessor,
    softmax: bool,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels.len())
            .field("preprocessor", &self.preprocessor)
            .field("softmax", &self.softmax)
            .finish()
    }
}

impl Predictor {
    pub fn new(classifier: Arc<dyn Classifier>, labels: ClassTable, preprocessor: Preprocessor) -> Self {
        Self {
            classifier,
            labels,
            preprocessor,
            softmax: false,
        }
    }

    /// Apply softmax to the classifier output (for models exported without
    /// a final softmax layer).
    pub fn with_softmax(mut self, softmax: bool) -> Self {
        self.softmax = softmax;
        self
    }

    pub fn labels(&self) -> &ClassTable {
        &self.labels
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Run a blank image through the classifier and check its output length
    /// against the class table.
    ///
    /// Called once at startup so a model/label mismatch aborts the process
    /// instead of surfacing on the first request.
    pub fn probe(&self) -> Result<()> {
        let scores = self.classifier.classify(&self.preprocessor.blank())?;
        self.check_alignment(&scores)?;
        debug!(classes = scores.len(), "model probe passed");
        Ok(())
    }

    /// Full pipeline for one uploaded image, counted in the prediction metrics.
    pub fn predict(&self, bytes: &[u8]) -> Result<Prediction> {
        let result = self.evaluate(bytes);
        record_outcome(&result);
        result
    }

    /// Full pipeline without recording the outcome.
    ///
    /// For callers that may abandon the call (the HTTP handler on timeout)
    /// and record the outcome themselves once the answer is delivered.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len(), classifier = self.classifier.name()))]
    pub fn evaluate(&self, bytes: &[u8]) -> Result<Prediction> {
        self.preprocessor
            .prepare(bytes)
            .and_then(|input| self.predict_tensor(&input))
    }

    /// Classify an already prepared input tensor.
    pub fn predict_tensor(&self, input: &Array4<f32>) -> Result<Prediction> {
        let start = Instant::now();
        let scores = self.classifier.classify(input)?;
        metrics::histogram!(telemetry::INFERENCE_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        self.check_alignment(&scores)?;
        let scores = if self.softmax { softmax(&scores) } else { scores };

        let (index, best) = argmax(&scores)?;
        let label = self.labels.get(index).ok_or(FruitscanError::LabelMismatch {
            expected: self.labels.len(),
            actual: scores.len(),
        })?;

        debug!(index, score = best, fruit = %label.fruit, class = %label.condition, "predicted");

        Ok(Prediction {
            fruit: label.fruit.clone(),
            class: label.condition.clone(),
            confidence: f64::from(best.clamp(0.0, 1.0)) * 100.0,
        })
    }

    fn check_alignment(&self, scores: &[f32]) -> Result<()> {
        if scores.len() != self.labels.len() {
            return Err(FruitscanError::LabelMismatch {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }
        Ok(())
    }
}

/// Count one delivered prediction (or failure) per request.
pub(crate) fn record_outcome(result: &Result<Prediction>) {
    match result {
        Ok(prediction) => {
            metrics::counter!(telemetry::PREDICTIONS_TOTAL, "status" => "ok", "kind" => "none")
                .increment(1);
            metrics::counter!(telemetry::PREDICTED_CLASS_TOTAL,
                "fruit" => prediction.fruit.clone(),
                "class" => prediction.class.clone())
            .increment(1);
        }
        Err(e) => {
            metrics::counter!(telemetry::PREDICTIONS_TOTAL, "status" => "error", "kind" => e.kind())
                .increment(1);
        }
    }
}

/// Index and value of the largest score; the first one wins on ties.
fn argmax(scores: &[f32]) -> Result<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(FruitscanError::Inference(format!(
                "model produced a non-finite score at index {i}"
            )));
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((i, score)),
        }
    }
    best.ok_or_else(|| FruitscanError::Inference("model produced no scores".to_string()))
}

/// Softmax function.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|x| x / sum).collect()
}
