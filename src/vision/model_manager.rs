// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection model manager
//!
//! Loads the detector once at startup. A model that fails to load leaves the
//! manager empty; detection endpoints then report "Model not loaded" until the
//! process is restarted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::vision::detection::{
    probe_accelerator, ComputeDevice, Detector, DetectorParams, YoloDetectionModel,
};

/// Configuration for loading the detection model
#[derive(Debug, Clone)]
pub struct DetectionModelConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// True when the path came from the environment or the command line
    pub path_overridden: bool,
    /// Session and decoder parameters
    pub params: DetectorParams,
}

impl Default for DetectionModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(crate::config::DEFAULT_MODEL_PATH),
            path_overridden: false,
            params: DetectorParams::default(),
        }
    }
}

/// Owner of the (optional) loaded detector
pub struct DetectionModelManager {
    detector: Option<Arc<dyn Detector>>,
    device: ComputeDevice,
    model_path: PathBuf,
    load_error: Option<String>,
}

impl std::fmt::Debug for DetectionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionModelManager")
            .field("loaded", &self.detector.is_some())
            .field("device", &self.device)
            .field("model_path", &self.model_path)
            .field("load_error", &self.load_error)
            .finish()
    }
}

impl DetectionModelManager {
    /// Load the detection model described by `config`
    ///
    /// Never fails: loading problems are logged, kept in [`Self::load_error`]
    /// and leave the manager without a detector.
    pub async fn new(config: DetectionModelConfig) -> Self {
        let path = config.model_path.clone();

        if !path.exists() {
            let message = format!("Model file not found at {}", path.display());
            if config.path_overridden {
                tracing::warn!(
                    "⚠️ {}. Check FACE_MODEL_PATH / MODEL_PATH or --model-path",
                    message
                );
            } else {
                tracing::error!(
                    "❌ {}. Place the model there or set FACE_MODEL_PATH / MODEL_PATH",
                    message
                );
            }
            return Self::failed(path, probe_accelerator(), message);
        }

        match YoloDetectionModel::new(&path, config.params).await {
            Ok(model) => {
                tracing::info!(
                    "✅ Detection model loaded from {} ({} classes)",
                    path.display(),
                    model.class_names().len()
                );
                let device = model.device();
                Self {
                    detector: Some(Arc::new(model)),
                    device,
                    model_path: path,
                    load_error: None,
                }
            }
            Err(e) => {
                tracing::error!("❌ Failed to load detection model from {}: {:#}", path.display(), e);
                Self::failed(path, probe_accelerator(), format!("{:#}", e))
            }
        }
    }

    /// Wrap an already constructed detector
    pub fn with_detector(detector: Arc<dyn Detector>, model_path: impl AsRef<Path>) -> Self {
        Self {
            device: detector.device(),
            detector: Some(detector),
            model_path: model_path.as_ref().to_path_buf(),
            load_error: None,
        }
    }

    /// A manager with no detector, reporting `device`
    pub fn unloaded(device: ComputeDevice) -> Self {
        Self::failed(PathBuf::new(), device, "model not configured".to_string())
    }

    fn failed(model_path: PathBuf, device: ComputeDevice, load_error: String) -> Self {
        Self {
            detector: None,
            device,
            model_path,
            load_error: Some(load_error),
        }
    }

    /// Get the detector if the model loaded
    pub fn get_detector(&self) -> Option<Arc<dyn Detector>> {
        self.detector.clone()
    }

    /// Check if a detector is available
    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Why loading failed, if it did
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }
}
