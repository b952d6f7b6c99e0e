//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fruitscan_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `status` — outcome: "ok" or "error"
//! - `kind` — error category from `FruitscanError::kind`, "none" on success

/// Total `/predict` calls that reached the pipeline.
///
/// Labels: `status` ("ok" | "error"), `kind`.
pub const PREDICTIONS_TOTAL: &str = "fruitscan_predictions_total";

/// Classifier forward-pass duration in seconds (excludes decoding).
pub const INFERENCE_DURATION_SECONDS: &str = "fruitscan_inference_duration_seconds";

/// Successful predictions per label.
///
/// Labels: `fruit`, `class`.
pub const PREDICTED_CLASS_TOTAL: &str = "fruitscan_predicted_class_total";

/// Requests rejected before inference (overload, timeout, bad upload).
///
/// Labels: `kind`.
pub const REJECTED_TOTAL: &str = "fruitscan_rejected_total";
