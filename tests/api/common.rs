// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for the HTTP tests: a stub detector, encoded test images,
//! multipart bodies and an app wired to a temporary upload directory.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, Response},
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use object_detection_api::{
    api::{create_app, AppState},
    storage::{RetentionPolicy, UploadStore},
    vision::{encode_image, BoundingBox, ComputeDevice, Detection, DetectionModelManager, Detector},
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BOUNDARY: &str = "object-detection-test-boundary";
pub const IMAGE_WIDTH: u32 = 64;
pub const IMAGE_HEIGHT: u32 = 48;
pub const TEST_BODY_LIMIT: usize = 1024 * 1024;

/// Detector returning canned detections and recording the threshold it saw
pub struct StubDetector {
    detections: Vec<Detection>,
    failure: Option<String>,
    last_threshold: Mutex<Option<f32>>,
}

impl StubDetector {
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            failure: None,
            last_threshold: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            detections: Vec::new(),
            failure: Some(message.to_string()),
            last_threshold: Mutex::new(None),
        }
    }

    pub fn last_threshold(&self) -> Option<f32> {
        *self.last_threshold.lock().unwrap()
    }
}

impl Detector for StubDetector {
    fn detect(&self, _image: &RgbImage, confidence_threshold: f32) -> anyhow::Result<Vec<Detection>> {
        *self.last_threshold.lock().unwrap() = Some(confidence_threshold);

        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(self.detections.clone()),
        }
    }

    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }
}

/// Two boxes inside an IMAGE_WIDTH x IMAGE_HEIGHT frame
pub fn sample_detections() -> Vec<Detection> {
    vec![
        Detection {
            id: 0,
            class_name: "face".to_string(),
            confidence: 0.91,
            bbox: BoundingBox {
                x1: 4.0,
                y1: 20.0,
                x2: 30.0,
                y2: 40.0,
            },
        },
        Detection {
            id: 1,
            class_name: "face".to_string(),
            confidence: 0.47,
            bbox: BoundingBox {
                x1: 34.0,
                y1: 22.0,
                x2: 60.0,
                y2: 46.0,
            },
        },
    ]
}

/// Encoded IMAGE_WIDTH x IMAGE_HEIGHT test image
pub fn image_bytes(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(IMAGE_WIDTH, IMAGE_HEIGHT, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, 128])
    });
    encode_image(&image, format).unwrap()
}

/// multipart/form-data body with a single part
pub fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, name
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    multipart_request(multipart_body("file", Some(filename), content))
}

pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn live_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Router plus the temporary upload directory backing it
pub struct TestApp {
    pub router: Router,
    pub uploads_dir: TempDir,
}

impl TestApp {
    pub fn dir(&self) -> PathBuf {
        self.uploads_dir.path().to_path_buf()
    }

    /// Names of the files currently stored
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.uploads_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }
}

pub async fn app_with(
    detector: Option<Arc<StubDetector>>,
    retention: RetentionPolicy,
    max_upload_bytes: usize,
) -> TestApp {
    let uploads_dir = TempDir::new().unwrap();
    let uploads = UploadStore::new(uploads_dir.path(), retention).await.unwrap();

    let models = match detector {
        Some(detector) => {
            let detector: Arc<dyn Detector> = detector;
            DetectionModelManager::with_detector(detector, "stub.onnx")
        }
        None => DetectionModelManager::unloaded(ComputeDevice::Cpu),
    };

    let state = AppState::new(Arc::new(models), Arc::new(uploads), max_upload_bytes);

    TestApp {
        router: create_app(state),
        uploads_dir,
    }
}

/// App with a loaded stub detector and default retention
pub async fn loaded_app(detector: Arc<StubDetector>) -> TestApp {
    app_with(Some(detector), RetentionPolicy::default(), TEST_BODY_LIMIT).await
}

/// App whose model failed to load
pub async fn unloaded_app() -> TestApp {
    app_with(None, RetentionPolicy::default(), TEST_BODY_LIMIT).await
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}
