// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration read from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::upload_store::DEFAULT_MAX_FILES;
use crate::storage::RetentionPolicy;
use crate::vision::detection::postprocess::{DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS};
use crate::vision::detection::preprocessing::DEFAULT_INPUT_SIZE;
use crate::vision::detection::DetectorParams;
use crate::vision::model_manager::DetectionModelConfig;

/// Model location used when neither FACE_MODEL_PATH nor MODEL_PATH is set
pub const DEFAULT_MODEL_PATH: &str = "./models/face_detection.onnx";

pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Request body limit for the detection endpoints (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the detection service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// ONNX model file
    pub model_path: PathBuf,
    /// True when the model path was set explicitly
    pub model_path_overridden: bool,
    /// Directory for stored originals and annotated results
    pub upload_dir: PathBuf,
    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
    /// Upload directory retention
    pub retention: RetentionPolicy,
    /// Session and decoder parameters
    pub detector: DetectorParams,
}

/// Pick the model path: FACE_MODEL_PATH, then MODEL_PATH, then the default
///
/// Empty values count as unset. The flag is true when a variable was used.
pub fn resolve_model_path(face_model_path: Option<String>, model_path: Option<String>) -> (PathBuf, bool) {
    face_model_path
        .filter(|v| !v.trim().is_empty())
        .or_else(|| model_path.filter(|v| !v.trim().is_empty()))
        .map(|v| (PathBuf::from(v), true))
        .unwrap_or_else(|| (PathBuf::from(DEFAULT_MODEL_PATH), false))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (environment-shaped key/value source)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (model_path, model_path_overridden) =
            resolve_model_path(lookup("FACE_MODEL_PATH"), lookup("MODEL_PATH"));

        // 0 disables the count limit
        let max_files = match parse_or(lookup("UPLOAD_MAX_FILES"), DEFAULT_MAX_FILES) {
            0 => None,
            n => Some(n),
        };
        let max_age = lookup("UPLOAD_MAX_AGE_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let defaults = DetectorParams::default();

        Self {
            host: lookup("HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(lookup("API_PORT"), DEFAULT_PORT),
            model_path,
            model_path_overridden,
            upload_dir: lookup("UPLOAD_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_or(lookup("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES),
            retention: RetentionPolicy { max_files, max_age },
            detector: DetectorParams {
                input_size: parse_or(lookup("MODEL_INPUT_SIZE"), DEFAULT_INPUT_SIZE),
                iou_threshold: parse_or(lookup("NMS_IOU_THRESHOLD"), DEFAULT_IOU_THRESHOLD),
                max_detections: parse_or(lookup("MAX_DETECTIONS"), DEFAULT_MAX_DETECTIONS),
                ..defaults
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than 0".to_string());
        }
        if self.detector.input_size == 0 || self.detector.input_size % 32 != 0 {
            return Err(format!(
                "MODEL_INPUT_SIZE must be a positive multiple of 32, got {}",
                self.detector.input_size
            ));
        }
        if !(self.detector.iou_threshold > 0.0 && self.detector.iou_threshold <= 1.0) {
            return Err(format!(
                "NMS_IOU_THRESHOLD must be in (0, 1], got {}",
                self.detector.iou_threshold
            ));
        }
        if self.detector.max_detections == 0 {
            return Err("MAX_DETECTIONS must be greater than 0".to_string());
        }
        Ok(())
    }

    /// `host:port` to bind; the host may be a name or an IP
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Model loader settings derived from this configuration
    pub fn model_config(&self) -> DetectionModelConfig {
        DetectionModelConfig {
            model_path: self.model_path.clone(),
            path_overridden: self.model_path_overridden,
            params: self.detector.clone(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            model_path_overridden: false,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retention: RetentionPolicy::default(),
            detector: DetectorParams::default(),
        }
    }
}
