// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO detection model backed by ONNX Runtime
//!
//! The session is registered on CUDA when the execution provider is available
//! and falls back to CPU otherwise.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ndarray::{Array4, ArrayD};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::labels::{ClassNames, NAMES_METADATA_KEY};
use super::postprocess::{
    decode_candidates, non_max_suppression, to_detections, DEFAULT_IOU_THRESHOLD,
    DEFAULT_MAX_DETECTIONS,
};
use super::preprocessing::{preprocess_for_detection, DEFAULT_INPUT_SIZE};
use super::{ComputeDevice, Detection, Detector};

/// Tuning knobs for the detection session and decoder
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParams {
    /// Square input size the model was exported with
    pub input_size: u32,
    /// IoU threshold for non-maximum suppression
    pub iou_threshold: f32,
    /// Cap on detections returned per image
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            intra_threads: 4,
        }
    }
}

/// Report which device a new session would land on
pub fn probe_accelerator() -> ComputeDevice {
    match CUDAExecutionProvider::default().is_available() {
        Ok(true) => ComputeDevice::Cuda,
        Ok(false) => ComputeDevice::Cpu,
        Err(e) => {
            debug!("CUDA availability probe failed: {}", e);
            ComputeDevice::Cpu
        }
    }
}

/// YOLO object detection model
#[derive(Clone)]
pub struct YoloDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Labels read from the model metadata
    class_names: ClassNames,
    /// Device the session was committed on
    device: ComputeDevice,
    params: DetectorParams,
}

impl std::fmt::Debug for YoloDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetectionModel")
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .field("device", &self.device)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl YoloDetectionModel {
    /// Load the detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails on every device
    /// - Model has no inputs
    pub async fn new<P: AsRef<Path>>(model_path: P, params: DetectorParams) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let (session, device) = match probe_accelerator() {
            ComputeDevice::Cuda => {
                info!("   Attempting CUDA execution provider...");
                match build_session(model_path, ComputeDevice::Cuda, params.intra_threads) {
                    Ok(session) => (session, ComputeDevice::Cuda),
                    Err(e) => {
                        warn!("⚠️  CUDA execution provider failed: {:#}", e);
                        warn!("   Falling back to CPU execution provider");
                        (
                            build_session(model_path, ComputeDevice::Cpu, params.intra_threads)?,
                            ComputeDevice::Cpu,
                        )
                    }
                }
            }
            ComputeDevice::Cpu => (
                build_session(model_path, ComputeDevice::Cpu, params.intra_threads)?,
                ComputeDevice::Cpu,
            ),
        };

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("Detection model declares no inputs"))?;

        let class_names = read_class_names(&session);
        if class_names.is_empty() {
            warn!("Model metadata has no class names, falling back to class_<id> labels");
        }

        debug!(
            "Detection model loaded - input: {}, classes: {}",
            input_name,
            class_names.len()
        );
        info!("✅ Detection model loaded on {}", device.as_str().to_uppercase());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            device,
            params,
        })
    }

    pub fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Run the session on a preprocessed [1, 3, S, S] tensor
    fn run(&self, input: Array4<f32>) -> Result<ArrayD<f32>> {
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        Ok(output.to_owned())
    }
}

impl Detector for YoloDetectionModel {
    fn detect(&self, image: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let (input, letterbox) = preprocess_for_detection(image, self.params.input_size);
        let output = self.run(input)?;

        let num_classes = (!self.class_names.is_empty()).then(|| self.class_names.len());
        let candidates = decode_candidates(output.view(), confidence_threshold, num_classes)?;
        let candidate_count = candidates.len();
        let kept = non_max_suppression(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        );

        debug!(
            "Decoded {} candidates, {} after NMS (conf={:.2})",
            candidate_count,
            kept.len(),
            confidence_threshold
        );

        Ok(to_detections(
            kept,
            &letterbox,
            image.width(),
            image.height(),
            &self.class_names,
        ))
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }
}

fn build_session(model_path: &Path, device: ComputeDevice, intra_threads: usize) -> Result<Session> {
    let builder = Session::builder().context("Failed to create session builder")?;

    let builder = match device {
        ComputeDevice::Cuda => builder
            .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
            .context("Failed to set CUDA execution provider")?,
        ComputeDevice::Cpu => builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?,
    };

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load detection model from {}",
            model_path.display()
        ))
}

fn read_class_names(session: &Session) -> ClassNames {
    let raw = session
        .metadata()
        .and_then(|metadata| metadata.custom(NAMES_METADATA_KEY));

    match raw {
        Ok(Some(raw)) => ClassNames::from_metadata(&raw).unwrap_or_else(|| {
            warn!("Could not parse class names metadata: {}", raw);
            ClassNames::default()
        }),
        Ok(None) => ClassNames::default(),
        Err(e) => {
            debug!("Failed to read model metadata: {}", e);
            ClassNames::default()
        }
    }
}
