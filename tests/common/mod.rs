//! Shared fixtures: in-memory classifiers, test images and multipart bodies.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;

use fruitscan::server::config::ServerConfig;
use fruitscan::server::{self, ServiceState};
use fruitscan::{
    ClassTable, Classifier, FruitscanError, PredictResponse, Predictor, Preprocessor, Result,
};

// ============================================================================
// Mock classifiers
// ============================================================================

/// Picks the class from the red level of the top-left pixel: `red / 32`.
///
/// A solid image with red `32 * i + 16` is classified as `i` with 90%.
pub struct ColorClassifier {
    pub classes: usize,
    pub calls: AtomicUsize,
}

impl ColorClassifier {
    pub fn new() -> Self {
        Self {
            classes: 8,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Classifier for ColorClassifier {
    fn name(&self) -> &str {
        "color"
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = ((input[[0, 0, 0, 0]] / 32.0) as usize).min(self.classes - 1);
        let rest = 0.1 / (self.classes - 1) as f32;
        Ok((0..self.classes)
            .map(|i| if i == index { 0.9 } else { rest })
            .collect())
    }
}

/// Always returns the same scores.
pub struct FixedClassifier(pub Vec<f32>);

impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Fails every forward pass.
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Err(FruitscanError::Inference(
            "shape mismatch: expected [1,256,256,3]".to_string(),
        ))
    }
}

/// Panics inside the forward pass.
pub struct PanickingClassifier;

impl Classifier for PanickingClassifier {
    fn name(&self) -> &str {
        "panicking"
    }

    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        panic!("runtime aborted the forward pass")
    }
}

/// Blocks for `delay` before answering like [`ColorClassifier`].
pub struct SlowClassifier {
    pub delay: Duration,
}

impl Classifier for SlowClassifier {
    fn name(&self) -> &str {
        "slow"
    }

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        std::thread::sleep(self.delay);
        ColorClassifier::new().classify(input)
    }
}

// ============================================================================
// Images
// ============================================================================

/// Red level that [`ColorClassifier`] maps to `index`.
pub fn red_for(index: usize) -> u8 {
    (index * 32 + 16) as u8
}

pub fn solid_image(width: u32, height: u32, index: usize, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([red_for(index), 90, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png_for_class(index: usize) -> Vec<u8> {
    solid_image(64, 48, index, ImageFormat::Png)
}

// ============================================================================
// Service and requests
// ============================================================================

pub const BOUNDARY: &str = "fruitscan-test-boundary";

pub fn predictor(classifier: impl Classifier + 'static) -> Predictor {
    Predictor::new(
        Arc::new(classifier),
        ClassTable::builtin(),
        Preprocessor::default(),
    )
}

pub fn app_with(predictor: Predictor, config: &ServerConfig) -> Router {
    let state = ServiceState::new(predictor, config).unwrap().into_shared();
    server::router(state)
}

pub fn app(classifier: impl Classifier + 'static) -> Router {
    app_with(predictor(classifier), &ServerConfig::default())
}

/// One-part multipart body.
pub fn multipart_body(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn upload(bytes: &[u8]) -> Request<Body> {
    predict_request(multipart_body("file", Some("leaf.png"), bytes))
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_prediction(response: axum::response::Response) -> PredictResponse {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
