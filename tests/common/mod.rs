#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use surplus2serve::{
    config::AppConfig,
    ml::SpoilageRiskModel,
    services::{HttpPredictionClient, SpoilageService},
    AppState,
};
use tower::ServiceExt;

/// Minimal configuration suitable for tests.
pub fn test_config() -> AppConfig {
    AppConfig::new("127.0.0.1".to_string(), 0, "test".to_string())
}

/// Router backed by the local model only.
pub fn local_app() -> Router {
    let spoilage = SpoilageService::new(Arc::new(SpoilageRiskModel::new()));
    surplus2serve::app_router(AppState::new(test_config(), spoilage))
}

/// Router whose prediction service lives at `base_url`.
pub fn app_with_prediction_service(base_url: &str, timeout: Duration) -> Router {
    let client = HttpPredictionClient::new(base_url, timeout).expect("client should build");
    let spoilage =
        SpoilageService::new(Arc::new(SpoilageRiskModel::new())).with_backend(Arc::new(client));
    surplus2serve::app_router(AppState::new(test_config(), spoilage))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("json body"))
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router should respond");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri, None).await
}

pub async fn post(router: &Router, uri: &str, body: Value) -> TestResponse {
    send(router, Method::POST, uri, Some(body)).await
}
