// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch detection endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use std::fmt;
use tracing::{debug, error, info, warn};

use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::storage::UploadStore;
use crate::vision::image_utils::{allowed_extension, format_for_extension};
use crate::vision::{decode_image_bytes, draw_detections, encode_image, DEFAULT_CONFIDENCE_THRESHOLD};

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

pub const INVALID_FILE_TYPE: &str = "Invalid file type. Only JPG, JPEG, PNG, and BMP are supported.";

fn processing_error(e: impl fmt::Display) -> ApiError {
    error!("Detection failed: {:#}", e);
    ApiError::InternalError(format!("An error occurred while processing the image: {:#}", e))
}

/// Client-side form problems keep their 4xx status
fn multipart_error(e: MultipartError) -> ApiError {
    let status = e.status();
    let detail = e.body_text();

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Rejected oversized upload: {}", detail);
        ApiError::PayloadTooLarge(detail)
    } else if status.is_client_error() {
        debug!("Malformed multipart body: {}", detail);
        ApiError::InvalidRequest(detail)
    } else {
        processing_error(detail)
    }
}

/// Pull the first `file` part out of the form as (filename, bytes)
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_owned).filter(|f| !f.is_empty()) else {
            return Ok(None);
        };
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some((filename, data)));
    }

    Ok(None)
}

/// POST /detect - Detect objects in an uploaded image
///
/// Accepts a multipart form with a `file` part (jpg, jpeg, png or bmp). The
/// upload and an annotated copy are stored and returned as `/uploads/...` URLs
/// together with the detections.
///
/// # Errors
/// - 400 Bad Request: malformed form, missing file, unsupported extension,
///   undecodable image
/// - 413 Payload Too Large: body over the configured upload limit
/// - 500 Internal Server Error: model not loaded, processing failed
pub async fn detect_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    // 1. Model must be loaded
    let detector = state.detection_models.get_detector().ok_or_else(|| {
        warn!("Detection requested but model is not loaded");
        ApiError::ModelNotLoaded
    })?;

    // 2. Read the upload
    let (filename, data) = read_file_field(&mut multipart).await?.ok_or_else(|| {
        ApiError::ValidationError {
            field: FILE_FIELD.to_string(),
            message: "No file uploaded".to_string(),
        }
    })?;

    // 3. Extension check, independent of content
    let extension = allowed_extension(&filename).ok_or_else(|| {
        debug!("Rejected upload {:?}", filename);
        ApiError::ValidationError {
            field: FILE_FIELD.to_string(),
            message: INVALID_FILE_TYPE.to_string(),
        }
    })?;
    let output_format = format_for_extension(extension)
        .ok_or_else(|| processing_error(format!("no encoder for {}", extension)))?;

    // 4. Persist the original
    let original_name = UploadStore::generate_name(extension);
    state
        .uploads
        .save(&original_name, &data)
        .await
        .map_err(processing_error)?;

    // 5. Decode
    let image = tokio::task::spawn_blocking(move || decode_image_bytes(&data))
        .await
        .map_err(processing_error)?
        .map_err(|e| {
            warn!("Could not read uploaded image {}: {}", original_name, e);
            ApiError::InvalidRequest("Could not read the image".to_string())
        })?
        .0
        .to_rgb8();

    debug!(
        "Decoded upload {} ({}x{})",
        original_name,
        image.width(),
        image.height()
    );

    // 6-8. Inference, overlay and encode off the async runtime
    let (detections, annotated) = tokio::task::spawn_blocking(move || {
        let detections = detector.detect(&image, DEFAULT_CONFIDENCE_THRESHOLD)?;
        let mut annotated = image;
        draw_detections(&mut annotated, &detections);
        let encoded = encode_image(&annotated, output_format)?;
        anyhow::Ok((detections, encoded))
    })
    .await
    .map_err(processing_error)?
    .map_err(processing_error)?;

    let result_name = UploadStore::result_name(&original_name);
    state
        .uploads
        .save(&result_name, &annotated)
        .await
        .map_err(processing_error)?;

    // 9. Retention never fails the request
    if let Err(e) = state.uploads.sweep().await {
        warn!("Upload retention sweep failed: {:#}", e);
    }

    info!(
        "Detection complete for {}: {} objects",
        original_name,
        detections.len()
    );

    Ok(Json(DetectResponse::new(
        UploadStore::public_url(&original_name),
        UploadStore::public_url(&result_name),
        detections,
        state.detection_models.device(),
    )))
}
