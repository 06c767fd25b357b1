// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::{ComputeDevice, Detection};

/// Response from POST /detect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Always true on success
    pub success: bool,
    /// URL of the stored upload
    pub original_image: String,
    /// URL of the annotated copy
    pub processed_image: String,
    /// Detections ordered by descending confidence
    pub detections: Vec<Detection>,
    /// Device inference ran on
    pub device: ComputeDevice,
}

impl DetectResponse {
    pub fn new(
        original_image: String,
        processed_image: String,
        detections: Vec<Detection>,
        device: ComputeDevice,
    ) -> Self {
        Self {
            success: true,
            original_image,
            processed_image,
            detections,
            device,
        }
    }
}

/// Response from POST /detect/live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveDetectResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub device: ComputeDevice,
}

impl LiveDetectResponse {
    pub fn new(detections: Vec<Detection>, device: ComputeDevice) -> Self {
        Self {
            success: true,
            detections,
            device,
        }
    }
}
