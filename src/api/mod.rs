// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod uploads;

pub use detect::{
    detect_handler, detect_live_handler, DetectResponse, LiveDetectResponse, LiveQuery,
};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, HealthStatus, RootResponse};
pub use http_server::{create_app, start_server, AppState};
pub use uploads::get_upload_handler;
