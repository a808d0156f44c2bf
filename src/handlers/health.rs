use crate::{handlers::common::success_response, services::PredictionServiceStatus, AppState};
use axum::{extract::State, response::IntoResponse, response::Json};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Degraded,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: PredictionServiceStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Full health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub prediction_service: ComponentHealth,
    pub response_time_ms: u128,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Health check. A down prediction service only degrades the service since
/// estimates fall back to the local model.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let start = Instant::now();

    let check_start = Instant::now();
    let prediction_status = state.spoilage.prediction_service_status().await;
    let check_latency = check_start.elapsed().as_millis() as u64;

    let (message, latency_ms) = match prediction_status {
        PredictionServiceStatus::NotConfigured => {
            ("Local estimation only".to_string(), None)
        }
        PredictionServiceStatus::Up => ("Reachable".to_string(), Some(check_latency)),
        PredictionServiceStatus::Down => (
            "Unreachable; estimates use the local model".to_string(),
            Some(check_latency),
        ),
    };

    let status = if prediction_status == PredictionServiceStatus::Down {
        ComponentStatus::Degraded
    } else {
        ComponentStatus::Up
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: get_uptime_secs(),
        prediction_service: ComponentHealth {
            status: prediction_status,
            message,
            latency_ms,
        },
        response_time_ms: start.elapsed().as_millis(),
    })
}

/// Service information and endpoint index
pub async fn root_info() -> impl IntoResponse {
    success_response(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "health": "/health",
            "commodities": "/api/v1/commodities",
            "commodity_profile": "/api/v1/commodities/:name",
            "estimate": "/api/v1/spoilage/estimate",
            "estimate_local": "/api/v1/spoilage/estimate/local",
            "estimate_batch": "/api/v1/spoilage/estimate/batch",
            "listing_risk": "/api/v1/listings/risk"
        }
    }))
}
