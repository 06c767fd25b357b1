// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Parser;
use object_detection_api::{
    api::{start_server, AppState},
    cli::Cli,
    config::ServiceConfig,
    storage::UploadStore,
    version,
    vision::DetectionModelManager,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    tracing::info!("🚀 Starting {}", version::get_version_string());
    tracing::info!("📦 BUILD VERSION: {}", version::VERSION);

    let mut config = ServiceConfig::from_env();
    cli.apply(&mut config);
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    tracing::info!("🧠 Loading detection model from {}", config.model_path.display());
    let detection_models = DetectionModelManager::new(config.model_config()).await;
    if detection_models.has_detector() {
        tracing::info!(
            "✅ Detection model ready on {}",
            detection_models.device().as_str().to_uppercase()
        );
    } else {
        tracing::warn!(
            "⚠️ Serving without a model: detection endpoints will return 'Model not loaded'"
        );
    }

    let uploads = UploadStore::new(&config.upload_dir, config.retention.clone()).await?;

    let state = AppState::new(
        Arc::new(detection_models),
        Arc::new(uploads),
        config.max_upload_bytes,
    );

    start_server(&config.bind_address(), state).await?;

    tracing::info!("👋 Object Detection API stopped");
    Ok(())
}
