//! Fruitscan error types

use std::time::Duration;

/// Fruitscan error types
#[derive(Debug, thiserror::Error)]
pub enum FruitscanError {
    // Upload errors
    #[error("no file uploaded: expected a multipart field named 'file'")]
    MissingUpload,

    #[error("upload error: {0}")]
    Upload(String),

    #[error("upload too large: the limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Image errors
    #[error("cannot decode image: {0}")]
    Decode(String),

    // Inference errors
    #[error("inference failed: {0}")]
    Inference(String),

    /// Model output does not line up with the class table.
    ///
    /// Either the model was swapped without updating its labels, or the
    /// labels file belongs to another model.
    #[error("model produced {actual} scores but the class table has {expected} entries")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("server is overloaded, try again later")]
    Overloaded,

    // Startup errors
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FruitscanError {
    /// Short machine-readable category, used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingUpload | Self::Upload(_) | Self::PayloadTooLarge { .. } => "upload",
            Self::Decode(_) => "decode",
            Self::Inference(_) | Self::LabelMismatch { .. } => "inference",
            Self::Timeout(_) => "timeout",
            Self::Overloaded => "overloaded",
            Self::ModelLoad(_) => "model_load",
            Self::Configuration(_) => "configuration",
            Self::Io(_) => "io",
        }
    }

    /// Whether the caller caused this error (bad or missing upload).
    ///
    /// Everything else is a fault of the service or its model.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUpload
                | Self::Upload(_)
                | Self::PayloadTooLarge { .. }
                | Self::Decode(_)
        )
    }
}

impl From<image::ImageError> for FruitscanError {
    fn from(err: image::ImageError) -> Self {
        FruitscanError::Decode(err.to_string())
    }
}

/// Result type alias for Fruitscan operations
pub type Result<T> = std::result::Result<T, FruitscanError>;
