//! Image classification via ONNX Runtime.
//!
//! Expects a model exported with a single NHWC `f32` image input and a
//! `[1, num_classes]` score output as its first output.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::{debug, info};

use super::{Classifier, Device};
use crate::error::{FruitscanError, Result};

/// Session options for [`OnnxClassifier::load`].
#[derive(Debug, Clone, Default)]
pub struct OnnxOptions {
    pub device: Device,
    /// Intra-op thread count; 0 leaves the runtime default.
    pub intra_threads: usize,
    /// Name of the score output; the first output when unset.
    pub output_name: Option<String>,
}

/// Classifier backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent requests serialise on
/// the session mutex. The session itself is never replaced after load.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    name: String,
    output_name: Option<String>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("output_name", &self.output_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load a model from disk.
    ///
    /// Fails if the file is missing or is not a valid ONNX graph.
    pub fn load(model_path: &Path, options: &OnnxOptions) -> Result<Self> {
        if !model_path.exists() {
            return Err(FruitscanError::ModelLoad(format!(
                "model file does not exist: {}",
                model_path.display()
            )));
        }

        info!(path = %model_path.display(), device = options.device.name(), "loading ONNX model");
        let session = build_session(model_path, options)?;
        debug!("ONNX session ready");

        Ok(Self {
            session: Mutex::new(session),
            name: model_name(model_path),
            output_name: options.output_name.clone(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let shape: [usize; 4] = input
            .shape()
            .try_into()
            .map_err(|_| FruitscanError::Inference("input tensor must be 4-D".to_string()))?;
        let data = input.as_slice().ok_or_else(|| {
            FruitscanError::Inference("input tensor is not contiguous".to_string())
        })?;

        let tensor = TensorRef::from_array_view((shape, data)).map_err(|e| {
            FruitscanError::Inference(format!("Failed to create input tensor: {}", e))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| FruitscanError::Inference(format!("ONNX session poisoned: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| FruitscanError::Inference(format!("ONNX inference failed: {}", e)))?;

        let scores = match self.output_name.as_deref() {
            Some(name) => outputs.get(name).ok_or_else(|| {
                FruitscanError::Inference(format!("No output named {name:?} found"))
            })?,
            None => &outputs[0],
        };

        // try_extract_tensor returns (&Shape, &[T])
        let (tensor_shape, values) = scores.try_extract_tensor::<f32>().map_err(|e| {
            FruitscanError::Inference(format!("Failed to extract scores: {}", e))
        })?;

        if tensor_shape.len() > 1 && tensor_shape[0] != 1 {
            return Err(FruitscanError::Inference(format!(
                "Expected a batch of 1, model returned {}",
                tensor_shape[0]
            )));
        }

        Ok(values.to_vec())
    }
}

/// Build an ONNX session with the appropriate execution provider.
fn build_session(model_path: &Path, options: &OnnxOptions) -> Result<Session> {
    let mut builder = Session::builder()
        .map_err(|e| FruitscanError::ModelLoad(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| FruitscanError::ModelLoad(format!("Failed to set optimization level: {}", e)))?;

    if options.intra_threads > 0 {
        builder = builder
            .with_intra_threads(options.intra_threads)
            .map_err(|e| FruitscanError::ModelLoad(format!("Failed to set thread count: {}", e)))?;
    }

    // Configure execution provider based on device
    let mut builder = match options.device {
        Device::Cpu => builder,
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => {
            use ort::ep::CUDA as CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id as i32)
                    .build()])
                .map_err(|e| {
                    FruitscanError::ModelLoad(format!("Failed to configure CUDA: {}", e))
                })?
        }
    };

    builder
        .commit_from_file(model_path)
        .map_err(|e| FruitscanError::ModelLoad(format!("Failed to load ONNX model: {}", e)))
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}
