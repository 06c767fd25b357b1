// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module
//!
//! This module provides:
//! - Object detection via a YOLO-family ONNX model
//! - Overlay drawing of detection results
//! - Image decode/encode helpers shared by the HTTP handlers

pub mod annotate;
pub mod detection;
pub mod image_utils;
pub mod model_manager;

pub use annotate::{draw_detections, format_label};
pub use detection::{
    BoundingBox, ComputeDevice, Detection, Detector, DetectorParams, YoloDetectionModel,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use image_utils::{decode_image_bytes, detect_format, encode_image, ImageError, ImageInfo};
pub use model_manager::{DetectionModelConfig, DetectionModelManager};
