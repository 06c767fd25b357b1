// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;
use crate::vision::ComputeDevice;

pub const ROOT_MESSAGE: &str = "Object Detection API is running";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub device: ComputeDevice,
    pub model_loaded: bool,
}

/// GET / - liveness text
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

/// GET /health - always 200; `degraded` while no model is loaded
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.detection_models.has_detector();

    Json(HealthResponse {
        status: if model_loaded {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        device: state.detection_models.device(),
        model_loaded,
    })
}
