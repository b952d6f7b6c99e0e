//! Public types for the Fruitscan API.

mod labels;
mod prediction;

pub use labels::{ClassLabel, ClassTable};
pub use prediction::{PredictResponse, Prediction};
