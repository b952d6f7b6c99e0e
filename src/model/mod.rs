//! Model runtimes behind the [`Classifier`] trait.

pub mod classifier;
pub mod device;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::Classifier;
pub use device::Device;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxClassifier, OnnxOptions};
