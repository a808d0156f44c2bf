//! Surplus2Serve spoilage service
//!
//! Spoilage risk estimation for surplus-food listings, with an optional
//! external prediction service in front of a deterministic local model.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod ml;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::SpoilageService;

/// Headroom on top of the prediction timeout before a request is abandoned
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 5;

// App state definition
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub spoilage: SpoilageService,
}

impl AppState {
    /// Builds the spoilage service from the configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, ServiceError> {
        let spoilage = SpoilageService::from_settings(&config.spoilage)?;
        Ok(Self {
            config: Arc::new(config),
            spoilage,
        })
    }

    pub fn new(config: AppConfig, spoilage: SpoilageService) -> Self {
        Self {
            config: Arc::new(config),
            spoilage,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/commodities", get(handlers::commodities::list_commodities))
        .route(
            "/commodities/:name",
            get(handlers::commodities::get_commodity),
        )
        .route("/spoilage/estimate", post(handlers::spoilage::estimate))
        .route(
            "/spoilage/estimate/local",
            post(handlers::spoilage::estimate_local),
        )
        .route(
            "/spoilage/estimate/batch",
            post(handlers::spoilage::estimate_batch),
        )
        .route("/listings/risk", post(handlers::listings::listing_risk))
}

/// Full application router with request ids, tracing and a request timeout.
/// CORS is applied by the binary since it depends on deployment settings.
pub fn app_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(
        state.config.spoilage.prediction_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS,
    );

    Router::new()
        .route("/", get(handlers::health::root_info))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(request_timeout))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::config::{AppConfig, SpoilageSettings};
    pub use crate::errors::*;
    pub use crate::ml::*;
    pub use crate::services::*;
    pub use crate::{app_router, ApiResponse, AppState};
}
