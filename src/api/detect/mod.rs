// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /detect (multipart upload, stored and annotated) and
//! POST /detect/live (raw body, nothing stored).

pub mod handler;
pub mod live;
pub mod response;

pub use handler::detect_handler;
pub use live::{detect_live_handler, resolve_confidence, LiveQuery};
pub use response::{DetectResponse, LiveDetectResponse};
