// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval of stored images

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::image_utils::content_type_for;

/// GET /uploads/{filename} - Serve a stored original or annotated image
pub async fn get_upload_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.uploads.read(&filename).await.map_err(|e| {
        error!("Failed to read upload {}: {:#}", filename, e);
        ApiError::InternalError(format!("{:#}", e))
    })?;

    let Some(bytes) = bytes else {
        debug!("Upload not found: {}", filename);
        return Err(ApiError::NotFound("File not found".to_string()));
    };

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}
