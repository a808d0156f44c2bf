use crate::{
    errors::{ApiError, ServiceError},
    handlers::common::{parse_json, validate_input},
    ml::spoilage_model::{
        AssessmentSource, Audience, EstimateOptions, Observation, RiskAssessment, RiskTier,
        ScoreBreakdown, StorageType, ThresholdProfile,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Largest number of observations accepted by the batch endpoint
pub const MAX_BATCH_SIZE: usize = 100;

fn default_transport_duration() -> f64 {
    8.0
}

fn default_true() -> bool {
    true
}

/// Storage conditions of one batch as submitted by a listing form.
/// Accepts the prediction service's field names as aliases.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ObservationInput {
    #[serde(alias = "Commodity_name")]
    #[validate(length(min = 1, max = 100))]
    pub commodity_name: String,
    #[serde(alias = "Temperature")]
    pub temperature: f64,
    #[serde(alias = "Humidity")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: f64,
    #[serde(alias = "Days_Since_Harvest")]
    pub days_since_harvest: u32,
    /// Unrecognized values are treated as cold storage
    #[serde(default, alias = "Storage_Type")]
    pub storage_type: Option<String>,
    #[serde(default = "default_transport_duration", alias = "Transport_Duration")]
    #[validate(range(min = 0.0))]
    pub transport_duration_hours: f64,
}

impl ObservationInput {
    pub fn to_observation(&self) -> Result<Observation, ServiceError> {
        Observation::builder(self.commodity_name.as_str())
            .temperature_c(self.temperature)
            .humidity_pct(self.humidity)
            .days_since_harvest(self.days_since_harvest)
            .storage_type(
                self.storage_type
                    .as_deref()
                    .map(StorageType::parse_lenient)
                    .unwrap_or_default(),
            )
            .transport_duration_hours(self.transport_duration_hours)
            .build()
    }
}

/// Options shared by the single and batch endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EstimatePolicy {
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub threshold_profile: Option<ThresholdProfile>,
    #[serde(default = "default_true")]
    pub include_shelf_life: bool,
}

impl EstimatePolicy {
    fn options(&self, state: &AppState, prefer_external: bool) -> EstimateOptions {
        EstimateOptions {
            threshold_profile: self
                .threshold_profile
                .unwrap_or(state.config.spoilage.default_threshold_profile),
            audience: self.audience,
            include_shelf_life: self.include_shelf_life,
            prefer_external,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EstimateRequest {
    #[serde(flatten)]
    #[validate]
    pub observation: ObservationInput,
    #[serde(flatten)]
    pub policy: EstimatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchEstimateRequest {
    pub observations: Vec<ObservationInput>,
    #[serde(flatten)]
    pub policy: EstimatePolicy,
}

/// Serialized assessment
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResponse {
    pub commodity_name: String,
    pub risk_score: u8,
    pub risk_tier: RiskTier,
    pub risk_label: &'static str,
    pub risk_color: &'static str,
    pub threshold_profile: ThresholdProfile,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_shelf_life_days: Option<u32>,
    pub confidence: f64,
    pub source: AssessmentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}

impl AssessmentResponse {
    pub fn new(observation: &Observation, assessment: RiskAssessment) -> Self {
        let risk_tier = assessment.risk_tier();
        Self {
            commodity_name: observation.commodity_name().to_string(),
            risk_score: assessment.risk_score(),
            risk_tier,
            risk_label: risk_tier.label(),
            risk_color: risk_tier.color(),
            threshold_profile: assessment.threshold_profile(),
            estimated_shelf_life_days: assessment.estimated_shelf_life_days(),
            confidence: assessment.confidence(),
            source: assessment.source().clone(),
            recommendations: assessment.recommendations().to_vec(),
            breakdown: None,
        }
    }

    pub fn with_breakdown(mut self, breakdown: ScoreBreakdown) -> Self {
        self.breakdown = Some(breakdown);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEstimateResponse {
    pub count: usize,
    pub assessments: Vec<AssessmentResponse>,
}

/// Estimate with the prediction service first, falling back to the local model
pub async fn estimate(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AssessmentResponse>>, ApiError> {
    let payload = parse_json(payload)?;
    validate_input(&payload)?;
    let observation = payload.observation.to_observation()?;
    let options = payload.policy.options(&state, true);

    let assessment = state.spoilage.estimate(&observation, &options).await;
    info!(
        commodity = %observation.commodity_name(),
        risk_score = assessment.risk_score(),
        local = assessment.is_local(),
        "spoilage risk estimated"
    );

    Ok(Json(ApiResponse::success(AssessmentResponse::new(
        &observation,
        assessment,
    ))))
}

/// Estimate with the local model only; includes the score breakdown
pub async fn estimate_local(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AssessmentResponse>>, ApiError> {
    let payload = parse_json(payload)?;
    validate_input(&payload)?;
    let observation = payload.observation.to_observation()?;
    let options = payload.policy.options(&state, false);

    let assessment = state.spoilage.estimate_local(&observation, &options);
    let breakdown = state.spoilage.model().breakdown(&observation);

    Ok(Json(ApiResponse::success(
        AssessmentResponse::new(&observation, assessment).with_breakdown(breakdown),
    )))
}

pub async fn estimate_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchEstimateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchEstimateResponse>>, ApiError> {
    let payload = parse_json(payload)?;
    if payload.observations.is_empty() || payload.observations.len() > MAX_BATCH_SIZE {
        return Err(ApiError::ValidationError(format!(
            "Validation failed: observations must contain between 1 and {} items",
            MAX_BATCH_SIZE
        )));
    }

    let mut observations = Vec::with_capacity(payload.observations.len());
    for (index, input) in payload.observations.iter().enumerate() {
        input.validate().map_err(|e| {
            ApiError::ValidationError(format!("Validation failed: observations[{}]: {}", index, e))
        })?;
        observations.push(input.to_observation()?);
    }

    let options = payload.policy.options(&state, true);
    let assessments = state.spoilage.estimate_batch(&observations, &options).await;

    let assessments: Vec<AssessmentResponse> = observations
        .iter()
        .zip(assessments)
        .map(|(observation, assessment)| AssessmentResponse::new(observation, assessment))
        .collect();

    Ok(Json(ApiResponse::success(BatchEstimateResponse {
        count: assessments.len(),
        assessments,
    })))
}
