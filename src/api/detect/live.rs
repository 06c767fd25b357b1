// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Live detection endpoint handler
//!
//! Frames arrive as the raw request body and never touch the disk.

use axum::extract::{Query, State};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::response::LiveDetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_image_bytes, DEFAULT_CONFIDENCE_THRESHOLD};

/// Query parameters for POST /detect/live
///
/// `conf` stays a string so a malformed value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveQuery {
    pub conf: Option<String>,
}

/// Confidence threshold from the raw `conf` parameter
///
/// Parsed values are clamped to [0, 1] and NaN saturates to 1.0 (no
/// detections). Missing or unparsable input yields the default.
pub fn resolve_confidence(raw: Option<&str>) -> f32 {
    match raw.map(|v| v.trim().parse::<f32>()) {
        Some(Ok(value)) if value.is_nan() => 1.0,
        Some(Ok(value)) => value.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE_THRESHOLD,
    }
}

fn live_error(e: impl std::fmt::Display) -> ApiError {
    error!("Live detection failed: {:#}", e);
    ApiError::InternalError(format!("Live detection error: {:#}", e))
}

/// POST /detect/live - Detect objects in a raw image body
///
/// # Errors
/// - 400 Bad Request: empty body or undecodable image
/// - 500 Internal Server Error: model not loaded, inference failed
pub async fn detect_live_handler(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
    body: Bytes,
) -> Result<Json<LiveDetectResponse>, ApiError> {
    let detector = state
        .detection_models
        .get_detector()
        .ok_or(ApiError::ModelNotLoaded)?;

    if body.is_empty() {
        return Err(ApiError::InvalidRequest("Empty request body".to_string()));
    }

    let confidence = resolve_confidence(query.conf.as_deref());

    let detections = tokio::task::spawn_blocking(move || {
        let (image, _) = decode_image_bytes(&body).map_err(|e| {
            warn!("Could not decode live frame: {}", e);
            ApiError::InvalidRequest("Could not decode image".to_string())
        })?;
        detector
            .detect(&image.to_rgb8(), confidence)
            .map_err(live_error)
    })
    .await
    .map_err(live_error)??;

    debug!(
        "Live detection: {} objects (conf={:.2})",
        detections.len(),
        confidence
    );

    Ok(Json(LiveDetectResponse::new(
        detections,
        state.detection_models.device(),
    )))
}
