//! Image decoding and tensor preparation.
//!
//! Uploaded bytes are decoded in whatever format they arrive in, converted to
//! 8-bit RGB (dropping any alpha channel), resized to the square input size of
//! the model and laid out as a single-image NHWC batch of raw `0..=255` pixel
//! values. Normalisation is left to the exported model graph.

use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::{FruitscanError, Result};

/// Input resolution the bundled model was trained at.
pub const DEFAULT_INPUT_SIZE: u32 = 256;

/// Number of colour channels fed to the model.
pub const CHANNELS: usize = 3;

/// Resampling filter used when resizing uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    /// Bicubic; the default resampling of the library the model was trained with.
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Turns uploaded image bytes into model input tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    size: u32,
    filter: ResizeFilter,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            size: DEFAULT_INPUT_SIZE,
            filter: ResizeFilter::default(),
        }
    }
}

impl Preprocessor {
    pub fn new(size: u32, filter: ResizeFilter) -> Result<Self> {
        if size == 0 {
            return Err(FruitscanError::Configuration(
                "input size must be positive".to_string(),
            ));
        }
        Ok(Self { size, filter })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Shape of the tensors produced by [`tensor`](Self::tensor): `[1, H, W, C]`.
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        [1, side, side, CHANNELS]
    }

    /// Decode an uploaded image, format guessed from its content.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(FruitscanError::Decode("uploaded file is empty".to_string()));
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Resize a decoded image and lay it out as an NHWC batch of one.
    pub fn tensor(&self, image: &DynamicImage) -> Result<Array4<f32>> {
        let resized = image
            .resize_exact(self.size, self.size, self.filter.into())
            .to_rgb8();
        let pixels: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();

        Array4::from_shape_vec(self.input_shape(), pixels)
            .map_err(|e| FruitscanError::Inference(format!("Failed to build input tensor: {e}")))
    }

    /// Decode and prepare in one step.
    pub fn prepare(&self, bytes: &[u8]) -> Result<Array4<f32>> {
        let image = self.decode(bytes)?;
        self.tensor(&image)
    }

    /// All-black input, used to probe a freshly loaded model.
    pub fn blank(&self) -> Array4<f32> {
        Array4::zeros(self.input_shape())
    }
}
