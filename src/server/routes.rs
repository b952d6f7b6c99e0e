//! HTTP routes: `GET /ping` and `POST /predict`.
//!
//! `/predict` never lets an error escape as a framework rejection or a panic:
//! every failure becomes a `{"error": "..."}` body. By default that body is
//! sent with status 200; with `strict_status` the status reflects the error.

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::time::Instant;
use tracing::{error, instrument, warn};

use super::state::AppState;
use crate::predictor::record_outcome;
use crate::telemetry;
use crate::types::{PredictResponse, Prediction};
use crate::{FruitscanError, Result};

/// Body of a successful `/ping`.
pub const PING_MESSAGE: &str = "Hello, I am alive";

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let cors = state.cors.clone();
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/ping", get(ping))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Liveness check. Touches no state.
pub async fn ping() -> Json<&'static str> {
    Json(PING_MESSAGE)
}

#[instrument(name = "POST /predict", skip_all)]
pub async fn predict(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    match run_predict(&state, multipart).await {
        Ok(prediction) => (StatusCode::OK, Json(PredictResponse::from(prediction))).into_response(),
        Err(e) => {
            if e.is_client_error() {
                warn!(kind = e.kind(), error = %e, "rejected upload");
            } else {
                error!(kind = e.kind(), error = %e, "prediction failed");
            }
            let status = if state.strict_status {
                error_status(&e)
            } else {
                StatusCode::OK
            };
            (status, Json(PredictResponse::from(&e))).into_response()
        }
    }
}

async fn run_predict(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Prediction> {
    let mut multipart = multipart.map_err(|e| reject(FruitscanError::Upload(e.body_text())))?;
    let upload = read_upload(&mut multipart, state.max_upload_bytes)
        .await
        .map_err(reject)?;

    let timeout = state.inference_timeout;

    // Waiting for a free slot counts against the same deadline as inference.
    let deadline = Instant::now() + timeout;
    let permit = tokio::time::timeout_at(deadline, state.permits.clone().acquire_owned())
        .await
        .map_err(|_| reject(FruitscanError::Overloaded))?
        .map_err(|_| reject(FruitscanError::Overloaded))?;

    let predictor = state.predictor.clone();
    let task = tokio::task::spawn_blocking(move || {
        // Held until the forward pass ends, even if the request gave up.
        let _permit = permit;
        predictor.evaluate(&upload)
    });

    // Outcomes are counted here so an abandoned task is never counted.
    let result = match tokio::time::timeout_at(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(FruitscanError::Inference(format!(
            "inference task failed: {join_err}"
        ))),
        Err(_) => return Err(reject(FruitscanError::Timeout(timeout))),
    };
    record_outcome(&result);
    result
}

/// Read the uploaded file: the `file` field, or else the first field that
/// carries a filename.
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Bytes> {
    let upload_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FruitscanError::PayloadTooLarge { limit }
        } else {
            FruitscanError::Upload(e.body_text())
        }
    };

    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let named_file = field.name() == Some(UPLOAD_FIELD);
        let has_filename = field.file_name().is_some();

        if named_file {
            return field.bytes().await.map_err(upload_error);
        }
        if fallback.is_none() && has_filename {
            fallback = Some(field.bytes().await.map_err(upload_error)?);
        }
    }

    fallback.ok_or(FruitscanError::MissingUpload)
}

fn reject(err: FruitscanError) -> FruitscanError {
    metrics::counter!(telemetry::REJECTED_TOTAL, "kind" => err.kind()).increment(1);
    err
}

fn error_status(err: &FruitscanError) -> StatusCode {
    match err {
        FruitscanError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        FruitscanError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        FruitscanError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
