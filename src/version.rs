// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Object Detection API

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-object-detection-2025-10-17";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-17";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-onnx",
    "cuda-fallback-cpu",
    "multipart-upload",
    "live-detection",
    "annotated-results",
    "upload-retention",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Object Detection API {} ({})", VERSION_NUMBER, BUILD_DATE)
}
