//! Fruitscan - fruit leaf disease classification over HTTP
//!
//! Upload a photo of a leaf, get back the fruit, its condition and the
//! model's confidence. The crate is split so the pipeline can be used without
//! the HTTP layer:
//!
//! - [`Preprocessor`] decodes uploads and builds model input tensors,
//! - [`Classifier`] abstracts the model runtime (ONNX Runtime by default),
//! - [`Predictor`] ties a classifier to its [`ClassTable`],
//! - [`server`] exposes `GET /ping` and `POST /predict` with axum.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use fruitscan::model::{OnnxClassifier, OnnxOptions};
//! use fruitscan::{ClassTable, Predictor, Preprocessor};
//!
//! fn main() -> fruitscan::Result<()> {
//!     let model = OnnxClassifier::load(Path::new("fruitscan.onnx"), &OnnxOptions::default())?;
//!     let predictor = Predictor::new(Arc::new(model), ClassTable::builtin(), Preprocessor::default());
//!     predictor.probe()?;
//!
//!     let bytes = std::fs::read("leaf.jpg")?;
//!     let prediction = predictor.predict(&bytes)?;
//!     println!("{} / {} ({:.2}%)", prediction.fruit, prediction.class, prediction.confidence);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod model;
pub mod predictor;
pub mod preprocess;
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{FruitscanError, Result};
pub use model::{Classifier, Device};
pub use predictor::Predictor;
pub use preprocess::{Preprocessor, ResizeFilter};
pub use types::{ClassLabel, ClassTable, PredictResponse, Prediction};
pub use version::{PKG_VERSION, version_string};
