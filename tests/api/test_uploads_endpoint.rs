// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /uploads/{filename}

use axum::http::{header, StatusCode};
use image::ImageFormat;
use tower::util::ServiceExt;

use super::common::{body_bytes, body_json, get_request, image_bytes, unloaded_app};

#[tokio::test]
async fn test_missing_file_is_404() {
    let app = unloaded_app().await;

    for _ in 0..3 {
        let name = format!("{}.png", uuid::Uuid::new_v4());
        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/uploads/{}", name)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["error_type"], "not_found");
        assert_eq!(json["detail"], "File not found");
    }
}

#[tokio::test]
async fn test_stored_file_is_served() {
    let app = unloaded_app().await;
    let bytes = image_bytes(ImageFormat::Jpeg);
    std::fs::write(app.dir().join("stored.jpg"), &bytes).unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/uploads/stored.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(body_bytes(response).await.to_vec(), bytes);
}

#[tokio::test]
async fn test_path_traversal_is_404() {
    let app = unloaded_app().await;
    std::fs::write(app.dir().join("inside.png"), b"x").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/uploads/..%2Finside.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
