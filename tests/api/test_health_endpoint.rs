// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Liveness endpoints: GET / and GET /health

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use std::sync::Arc;
use tower::util::ServiceExt;

use super::common::{body_json, get_request, loaded_app, sample_detections, unloaded_app, StubDetector};

#[tokio::test]
async fn test_root_reports_running() {
    let app = unloaded_app().await;

    let response = app.router.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Object Detection API is running");
}

#[tokio::test]
async fn test_health_with_model_loaded() {
    let app = loaded_app(Arc::new(StubDetector::returning(sample_detections()))).await;

    let response = app.router.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], true);
    assert_eq!(json["device"], "cpu");
}

#[tokio::test]
async fn test_health_still_ok_without_model() {
    let app = unloaded_app().await;

    let response = app.router.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["device"], "cpu");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = unloaded_app().await;

    let response = app.router.clone().oneshot(get_request("/v1/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = unloaded_app().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
