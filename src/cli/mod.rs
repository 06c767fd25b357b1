// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::config::ServiceConfig;

/// Object Detection API server
#[derive(Parser, Debug, Default)]
#[command(name = "object-detection-api")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Serve a YOLO object detection model over HTTP", long_about = None)]
pub struct Cli {
    /// Bind host (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// ONNX model file (overrides FACE_MODEL_PATH / MODEL_PATH)
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Directory for stored images (overrides UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,
}

impl Cli {
    /// Apply command line overrides on top of the environment configuration
    pub fn apply(self, config: &mut ServiceConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model_path) = self.model_path {
            config.model_path = model_path;
            config.model_path_overridden = true;
        }
        if let Some(upload_dir) = self.upload_dir {
            config.upload_dir = upload_dir;
        }
    }
}
