// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection on top of a YOLO-family ONNX export
//!
//! Components:
//! - `preprocessing` - Letterbox resize into the model's square input tensor
//! - `postprocess` - Candidate decoding, NMS and mapping back to image space
//! - `labels` - Class names read from the model metadata
//! - `model` - ONNX Runtime session wrapper with CUDA/CPU selection

pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocessing;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use labels::ClassNames;
pub use model::{probe_accelerator, DetectorParams, YoloDetectionModel};

/// Confidence threshold used when the caller does not supply one
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Compute device the detection session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Box corners in pixel coordinates of the decoded image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// A box is valid when it has a strictly positive extent on both axes
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One detected object, as returned to API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Position in the returned list (0-based, descending confidence)
    pub id: usize,
    /// Class label
    #[serde(rename = "class")]
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Box corners
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Anything that can turn an RGB image into detections
///
/// Implemented by [`YoloDetectionModel`]; handlers only see this trait so the
/// HTTP layer can run against a stub in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send + Sync {
    /// Run inference and return detections scoring above `confidence_threshold`
    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
    ) -> anyhow::Result<Vec<Detection>>;

    /// Device the detector runs on
    fn device(&self) -> ComputeDevice;
}
