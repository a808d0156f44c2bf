use crate::errors::ServiceError;
use crate::ml::recommendations;
use crate::ml::spoilage_model::{
    round_half_up, shelf_life_days, AssessmentSource, EstimateOptions, Observation,
    RiskAssessment, RiskTier,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Model version reported when the service omits one
const UNKNOWN_MODEL_VERSION: &str = "unknown";

/// Fields the prediction service requires but the estimator does not model.
/// They are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThroughFields {
    pub packaging_quality: String,
    pub location: String,
}

impl Default for PassThroughFields {
    fn default() -> Self {
        Self {
            packaging_quality: "good".to_string(),
            location: "Delhi".to_string(),
        }
    }
}

/// Request body for `POST {base}/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "Commodity_name")]
    pub commodity_name: String,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Days_Since_Harvest")]
    pub days_since_harvest: u32,
    #[serde(rename = "Storage_Type")]
    pub storage_type: String,
    #[serde(rename = "Transport_Duration")]
    pub transport_duration: f64,
    #[serde(rename = "Packaging_Quality")]
    pub packaging_quality: String,
    #[serde(rename = "Month_num")]
    pub month_num: u32,
    #[serde(rename = "Location")]
    pub location: String,
}

impl PredictionRequest {
    pub fn from_observation(
        observation: &Observation,
        pass_through: &PassThroughFields,
        month_num: u32,
    ) -> Self {
        Self {
            commodity_name: observation.commodity_name().to_string(),
            temperature: observation.temperature_c(),
            humidity: observation.humidity_pct(),
            days_since_harvest: observation.days_since_harvest(),
            storage_type: observation.storage_type().wire_value().to_string(),
            transport_duration: observation.transport_duration_hours(),
            packaging_quality: pass_through.packaging_quality.clone(),
            month_num,
            location: pass_through.location.clone(),
        }
    }
}

/// Response body of `POST {base}/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    #[serde(rename = "Spoilage_Risk_Score")]
    pub spoilage_risk_score: f64,
    #[serde(rename = "Spoilage_Risk")]
    pub spoilage_risk: i64,
    #[serde(rename = "Risk_Interpretation")]
    pub risk_interpretation: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    #[serde(rename = "Probabilities", default)]
    pub probabilities: serde_json::Value,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "Input_Summary", default)]
    pub input_summary: serde_json::Value,
    #[serde(rename = "Model_Version", default)]
    pub model_version: Option<String>,
    #[serde(rename = "Estimated_Shelf_Life", default)]
    pub estimated_shelf_life: Option<i64>,
}

impl PredictionResponse {
    /// Normalizes the service's answer into the estimator's output shape.
    /// Out-of-range scores or confidences make the whole answer unusable.
    pub fn into_assessment(self, options: &EstimateOptions) -> Result<RiskAssessment, ServiceError> {
        let PredictionResponse {
            spoilage_risk_score,
            spoilage_risk,
            risk_interpretation,
            confidence,
            probabilities: _,
            timestamp: _,
            input_summary: _,
            model_version,
            estimated_shelf_life,
        } = self;

        if !(0.0..=1.0).contains(&spoilage_risk_score) {
            return Err(ServiceError::unavailable(format!(
                "prediction score {spoilage_risk_score} is outside 0..=1"
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ServiceError::unavailable(format!(
                "prediction confidence {confidence} is outside 0..=1"
            )));
        }

        let risk_score = round_half_up(spoilage_risk_score * 100.0).clamp(0.0, 100.0) as u8;
        let reported_tier = RiskTier::from_interpretation(&risk_interpretation)
            .or_else(|| RiskTier::from_class(spoilage_risk))
            .unwrap_or_else(|| options.threshold_profile.classify(risk_score));
        let shelf_life = estimated_shelf_life
            .map(|days| days.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or_else(|| shelf_life_days(risk_score));
        let model_version = model_version.filter(|v| !v.trim().is_empty());

        let recommendations = recommendations::for_external_prediction(
            reported_tier,
            Some(shelf_life),
            confidence,
            model_version.as_deref(),
            options.audience,
        );
        let model_version = model_version.unwrap_or_else(|| UNKNOWN_MODEL_VERSION.to_string());

        Ok(RiskAssessment::new(
            risk_score,
            recommendations,
            options.include_shelf_life.then_some(shelf_life),
            confidence,
            AssessmentSource::External {
                model_version,
                reported_tier,
            },
            options.threshold_profile,
        ))
    }
}

/// Remote spoilage prediction backend
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, request: &PredictionRequest)
        -> Result<PredictionResponse, ServiceError>;

    /// Single liveness check.
    async fn health(&self) -> Result<(), ServiceError>;
}

/// HTTP client for the prediction service. One attempt per call, bounded by
/// the client timeout; every failure surfaces as `ServiceUnavailable`.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    base_url: String,
}

impl HttpPredictionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ServiceError::InternalError(format!("failed to construct prediction client: {e}"))
        })?;
        Ok(Self::with_client(base_url, client))
    }

    /// Build from an existing client (useful for testing).
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::unavailable(format!("{operation} timed out"))
    } else {
        ServiceError::unavailable(format!("{operation} failed: {err}"))
    }
}

#[async_trait]
impl PredictionBackend for HttpPredictionClient {
    #[instrument(skip(self, request), fields(commodity = %request.commodity_name))]
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, ServiceError> {
        let url = format!("{}/predict", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("prediction request", e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error("reading prediction response", e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(ServiceError::unavailable(format!(
                "prediction service error (status: {status}): {text}"
            )));
        }

        let prediction: PredictionResponse = serde_json::from_slice(&body).map_err(|e| {
            ServiceError::unavailable(format!("malformed prediction response: {e}"))
        })?;
        debug!(
            score = prediction.spoilage_risk_score,
            interpretation = %prediction.risk_interpretation,
            "prediction service answered"
        );
        Ok(prediction)
    }

    async fn health(&self) -> Result<(), ServiceError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("prediction health check", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::unavailable(format!(
                "prediction health check returned {}",
                response.status()
            )))
        }
    }
}
