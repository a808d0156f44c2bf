mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use serde_json::{json, Value};
use surplus2serve::{
    errors::ServiceError,
    ml::{Observation, StorageType},
    services::{
        prediction_client::{PassThroughFields, PredictionRequest},
        HttpPredictionClient, PredictionBackend,
    },
};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{app_with_prediction_service, get, post};

const TIMEOUT: Duration = Duration::from_secs(2);

fn ripe_tomato() -> Value {
    json!({
        "commodity_name": "Tomato",
        "temperature": 25.5,
        "humidity": 75.0,
        "days_since_harvest": 3,
        "storage_type": "ambient",
        "transport_duration_hours": 12.0
    })
}

fn high_risk_prediction() -> Value {
    json!({
        "Spoilage_Risk_Score": 0.82,
        "Spoilage_Risk": 2,
        "Risk_Interpretation": "High Risk",
        "Confidence": 0.93,
        "Probabilities": {"Low": 0.03, "Medium": 0.15, "High": 0.82},
        "Timestamp": "2024-06-01T10:00:00",
        "Input_Summary": {"Commodity": "Tomato"},
        "Model_Version": "v1.0"
    })
}

async fn assert_local_fallback(server: &MockServer) {
    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["source"]["kind"], "local_fallback");
    assert_eq!(data["confidence"], 0.8);
}

#[tokio::test]
async fn external_prediction_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_partial_json(json!({
            "Commodity_name": "Tomato",
            "Storage_Type": "room_temperature",
            "Packaging_Quality": "good",
            "Location": "Delhi"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(high_risk_prediction()))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["risk_score"], 82);
    assert_eq!(data["risk_tier"], "high");
    assert_eq!(data["confidence"], 0.93);
    assert_eq!(data["estimated_shelf_life_days"], 2);
    assert_eq!(data["source"]["kind"], "external");
    assert_eq!(data["source"]["model_version"], "v1.0");
    assert_eq!(data["source"]["reported_tier"], "high");

    let recommendations = data["recommendations"].as_array().unwrap();
    assert_eq!(
        recommendations.first().unwrap(),
        "HIGH SPOILAGE RISK! Immediate action required."
    );
    assert_eq!(
        recommendations.last().unwrap(),
        "Prediction powered by ML Model v1.0"
    );
    assert!(recommendations.contains(&json!("Estimated shelf life: 2 days")));
    assert!(recommendations.contains(&json!("Model confidence: 93%")));
}

#[tokio::test]
async fn request_body_carries_month_and_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(high_risk_prediction()))
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["Temperature"], 25.5);
    assert_eq!(body["Humidity"], 75.0);
    assert_eq!(body["Days_Since_Harvest"], 3);
    assert_eq!(body["Transport_Duration"], 12.0);
    let month = body["Month_num"].as_u64().unwrap();
    assert!((1..=12).contains(&month));
}

#[tokio::test]
async fn low_confidence_prediction_is_flagged_for_suppliers_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Spoilage_Risk_Score": 0.2,
            "Spoilage_Risk": 0,
            "Risk_Interpretation": "Low Risk",
            "Confidence": 0.55,
            "Estimated_Shelf_Life": 6
        })))
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);

    let supplier = post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;
    let data = &supplier.body["data"];
    assert_eq!(data["source"]["model_version"], "unknown");
    assert_eq!(data["estimated_shelf_life_days"], 6);
    let recommendations = data["recommendations"].as_array().unwrap();
    assert!(recommendations
        .iter()
        .filter_map(Value::as_str)
        .any(|r| r.starts_with("Lower confidence")));

    let mut body = ripe_tomato();
    body["audience"] = json!("customer");
    let customer = post(&app, "/api/v1/spoilage/estimate", body).await;
    let recommendations = customer.body["data"]["recommendations"].as_array().unwrap();
    assert!(!recommendations
        .iter()
        .filter_map(Value::as_str)
        .any(|r| r.starts_with("Lower confidence") || r.starts_with("Prediction powered by")));
}

#[tokio::test]
async fn server_error_falls_back_to_local_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .expect(1)
        .mount(&server)
        .await;

    assert_local_fallback(&server).await;
}

#[tokio::test]
async fn malformed_response_falls_back_to_local_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"Spoilage_Risk\": "))
        .mount(&server)
        .await;

    assert_local_fallback(&server).await;
}

#[tokio::test]
async fn out_of_range_score_falls_back_to_local_model() {
    let server = MockServer::start().await;
    let mut prediction = high_risk_prediction();
    prediction["Spoilage_Risk_Score"] = json!(1.4);
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(prediction))
        .mount(&server)
        .await;

    assert_local_fallback(&server).await;
}

#[tokio::test]
async fn slow_service_times_out_and_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(high_risk_prediction())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), Duration::from_millis(300));
    let response = post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["source"]["kind"], "local_fallback");
}

#[tokio::test]
async fn unreachable_service_falls_back() {
    let app = app_with_prediction_service("http://127.0.0.1:1", TIMEOUT);
    let response = post(&app, "/api/v1/spoilage/estimate", ripe_tomato()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["source"]["kind"], "local_fallback");
}

#[tokio::test]
async fn local_endpoint_never_calls_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(high_risk_prediction()))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = post(&app, "/api/v1/spoilage/estimate/local", ripe_tomato()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["source"]["kind"], "local_fallback");
}

#[tokio::test]
async fn batch_calls_the_service_per_observation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(high_risk_prediction()))
        .expect(3)
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = post(
        &app,
        "/api/v1/spoilage/estimate/batch",
        json!({ "observations": [ripe_tomato(), ripe_tomato(), ripe_tomato()] }),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["count"], 3);
}

#[tokio::test]
async fn health_reports_reachable_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = get(&app, "/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "up");
    assert_eq!(response.body["prediction_service"]["status"], "up");
}

#[tokio::test]
async fn unhealthy_service_degrades_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = app_with_prediction_service(&server.uri(), TIMEOUT);
    let response = get(&app, "/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "degraded");
    assert_eq!(response.body["prediction_service"]["status"], "down");
}

#[tokio::test]
async fn client_surfaces_failures_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = HttpPredictionClient::new(format!("{}/", server.uri()), TIMEOUT).unwrap();
    assert_eq!(client.base_url(), server.uri());

    let observation = Observation::builder("banana")
        .temperature_c(22.0)
        .humidity_pct(80.0)
        .days_since_harvest(4)
        .storage_type(StorageType::Ambient)
        .build()
        .unwrap();
    let request = PredictionRequest::from_observation(&observation, &PassThroughFields::default(), 6);

    assert_matches!(
        client.predict(&request).await,
        Err(ServiceError::ServiceUnavailable(msg)) if msg.contains("502")
    );
}
