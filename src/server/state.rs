//! Process-wide service state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tokio::sync::Semaphore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::{CorsConfig, ServerConfig};
use crate::predictor::Predictor;
use crate::{FruitscanError, Result};

/// Shared, read-only state behind every request.
///
/// Built once at startup after the model has loaded and passed its probe.
pub struct ServiceState {
    pub(crate) predictor: Arc<Predictor>,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) inference_timeout: Duration,
    pub(crate) max_upload_bytes: usize,
    pub(crate) strict_status: bool,
    pub(crate) cors: CorsLayer,
}

/// Handle type used as axum router state.
pub type AppState = Arc<ServiceState>;

impl ServiceState {
    pub fn new(predictor: Predictor, config: &ServerConfig) -> Result<Self> {
        let limits = &config.limits;
        if limits.max_concurrent_inferences == 0 {
            return Err(FruitscanError::Configuration(
                "max_concurrent_inferences must be at least 1".to_string(),
            ));
        }
        if limits.inference_timeout_secs == 0 {
            return Err(FruitscanError::Configuration(
                "inference_timeout_secs must be at least 1".to_string(),
            ));
        }
        if limits.max_upload_bytes == 0 {
            return Err(FruitscanError::Configuration(
                "max_upload_bytes must be positive".to_string(),
            ));
        }

        Ok(Self {
            predictor: Arc::new(predictor),
            permits: Arc::new(Semaphore::new(limits.max_concurrent_inferences)),
            inference_timeout: limits.inference_timeout(),
            max_upload_bytes: limits.max_upload_bytes,
            strict_status: config.strict_status,
            cors: cors_layer(&config.cors)?,
        })
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn into_shared(self) -> AppState {
        Arc::new(self)
    }
}

/// GET and POST from the configured origins (any origin when none are listed),
/// with any request header.
fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                FruitscanError::Configuration(format!("Invalid CORS origin {origin:?}: {e}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
