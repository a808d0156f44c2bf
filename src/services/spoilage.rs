use crate::config::SpoilageSettings;
use crate::errors::ServiceError;
use crate::ml::reference_tables::ReferenceTables;
use crate::ml::spoilage_model::{EstimateOptions, Observation, RiskAssessment, SpoilageRiskModel};
use crate::services::prediction_client::{
    HttpPredictionClient, PassThroughFields, PredictionBackend, PredictionRequest,
};
use chrono::Datelike;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Reachability of the external prediction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionServiceStatus {
    NotConfigured,
    Up,
    Down,
}

/// Spoilage estimation with an optional remote model in front of the local one
#[derive(Clone)]
pub struct SpoilageService {
    model: Arc<SpoilageRiskModel>,
    backend: Option<Arc<dyn PredictionBackend>>,
    pass_through: PassThroughFields,
}

impl SpoilageService {
    /// Local-only service
    pub fn new(model: Arc<SpoilageRiskModel>) -> Self {
        Self {
            model,
            backend: None,
            pass_through: PassThroughFields::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn PredictionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_pass_through(mut self, pass_through: PassThroughFields) -> Self {
        self.pass_through = pass_through;
        self
    }

    /// Builds the model from configured table overrides and, when a URL is
    /// configured, an HTTP prediction backend.
    pub fn from_settings(settings: &SpoilageSettings) -> Result<Self, ServiceError> {
        let tables = ReferenceTables::with_overrides(
            &settings.optimal_temperature_overrides,
            &settings.risk_multiplier_overrides,
        );
        let service = Self::new(Arc::new(SpoilageRiskModel::with_tables(tables)))
            .with_pass_through(PassThroughFields {
                packaging_quality: settings.default_packaging_quality.clone(),
                location: settings.default_location.clone(),
            });

        match settings.prediction_service_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                let client = HttpPredictionClient::new(
                    url,
                    Duration::from_secs(settings.prediction_timeout_secs),
                )?;
                info!(url = %client.base_url(), "external prediction service configured");
                Ok(service.with_backend(Arc::new(client)))
            }
            _ => {
                info!("no prediction service configured, using local estimation only");
                Ok(service)
            }
        }
    }

    pub fn model(&self) -> &SpoilageRiskModel {
        &self.model
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Local estimation only.
    pub fn estimate_local(&self, observation: &Observation, options: &EstimateOptions) -> RiskAssessment {
        self.model.estimate(observation, options)
    }

    /// Asks the prediction service once when configured and preferred; any
    /// failure falls back to the local model.
    #[instrument(skip(self, observation), fields(commodity = %observation.commodity_name()))]
    pub async fn estimate(
        &self,
        observation: &Observation,
        options: &EstimateOptions,
    ) -> RiskAssessment {
        let backend = self.backend.as_ref().filter(|_| options.prefer_external);
        if let Some(backend) = backend {
            match self.estimate_external(backend.as_ref(), observation, options).await {
                Ok(assessment) => return assessment,
                Err(err) if err.is_service_unavailable() => {
                    warn!(error = %err, "prediction service unavailable, using local estimation");
                }
                Err(err) => {
                    warn!(error = %err, "prediction failed, using local estimation");
                }
            }
        }

        self.estimate_local(observation, options)
    }

    async fn estimate_external(
        &self,
        backend: &dyn PredictionBackend,
        observation: &Observation,
        options: &EstimateOptions,
    ) -> Result<RiskAssessment, ServiceError> {
        let month = chrono::Utc::now().month();
        let request = PredictionRequest::from_observation(observation, &self.pass_through, month);
        backend.predict(&request).await?.into_assessment(options)
    }

    /// Estimates every observation concurrently. Output order matches input.
    #[instrument(skip(self, observations), fields(count = observations.len()))]
    pub async fn estimate_batch(
        &self,
        observations: &[Observation],
        options: &EstimateOptions,
    ) -> Vec<RiskAssessment> {
        join_all(
            observations
                .iter()
                .map(|observation| self.estimate(observation, options)),
        )
        .await
    }

    pub async fn prediction_service_status(&self) -> PredictionServiceStatus {
        let Some(backend) = self.backend.as_ref() else {
            return PredictionServiceStatus::NotConfigured;
        };

        match backend.health().await {
            Ok(()) => PredictionServiceStatus::Up,
            Err(err) => {
                warn!(error = %err, "prediction service health check failed");
                PredictionServiceStatus::Down
            }
        }
    }
}

impl std::fmt::Debug for SpoilageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpoilageService")
            .field("has_backend", &self.has_backend())
            .field("pass_through", &self.pass_through)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::spoilage_model::{AssessmentSource, StorageType};
    use crate::services::prediction_client::PredictionResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that answers from a fixed script and records requests
    struct ScriptedBackend {
        answer: fn() -> Result<PredictionResponse, ServiceError>,
        seen: Mutex<Vec<PredictionRequest>>,
    }

    impl ScriptedBackend {
        fn new(answer: fn() -> Result<PredictionResponse, ServiceError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PredictionBackend for ScriptedBackend {
        async fn predict(
            &self,
            request: &PredictionRequest,
        ) -> Result<PredictionResponse, ServiceError> {
            self.seen.lock().unwrap().push(request.clone());
            (self.answer)()
        }

        async fn health(&self) -> Result<(), ServiceError> {
            (self.answer)().map(|_| ())
        }
    }

    fn high_risk() -> Result<PredictionResponse, ServiceError> {
        Ok(serde_json::from_value(serde_json::json!({
            "Spoilage_Risk_Score": 0.82,
            "Spoilage_Risk": 2,
            "Risk_Interpretation": "High Risk",
            "Confidence": 0.93,
            "Model_Version": "v1.0"
        }))
        .unwrap())
    }

    fn unavailable() -> Result<PredictionResponse, ServiceError> {
        Err(ServiceError::unavailable("connection refused"))
    }

    fn potato() -> Observation {
        Observation::builder("potato")
            .temperature_c(8.0)
            .humidity_pct(90.0)
            .days_since_harvest(5)
            .storage_type(StorageType::ColdStorage)
            .transport_duration_hours(10.0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn local_only_service_uses_model() {
        let service = SpoilageService::new(Arc::new(SpoilageRiskModel::new()));
        let assessment = service.estimate(&potato(), &EstimateOptions::default()).await;
        assert_eq!(assessment.risk_score(), 11);
        assert!(assessment.is_local());
        assert_eq!(
            service.prediction_service_status().await,
            PredictionServiceStatus::NotConfigured
        );
    }

    #[tokio::test]
    async fn external_answer_is_used_when_available() {
        let backend = ScriptedBackend::new(high_risk);
        let service = SpoilageService::new(Arc::new(SpoilageRiskModel::new()))
            .with_backend(backend.clone());

        let assessment = service.estimate(&potato(), &EstimateOptions::default()).await;
        assert_eq!(assessment.risk_score(), 82);
        assert_eq!(assessment.confidence(), 0.93);
        assert!(matches!(assessment.source(), AssessmentSource::External { .. }));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].location, "Delhi");
        assert_eq!(service.prediction_service_status().await, PredictionServiceStatus::Up);
    }

    #[tokio::test]
    async fn unavailable_backend_falls_back_to_local() {
        let backend = ScriptedBackend::new(unavailable);
        let service = SpoilageService::new(Arc::new(SpoilageRiskModel::new()))
            .with_backend(backend.clone());

        let assessment = service.estimate(&potato(), &EstimateOptions::default()).await;
        assert!(assessment.is_local());
        assert_eq!(assessment.confidence(), 0.8);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
        assert_eq!(
            service.prediction_service_status().await,
            PredictionServiceStatus::Down
        );
    }

    #[tokio::test]
    async fn prefer_external_false_skips_backend() {
        let backend = ScriptedBackend::new(high_risk);
        let service = SpoilageService::new(Arc::new(SpoilageRiskModel::new()))
            .with_backend(backend.clone());
        let options = EstimateOptions {
            prefer_external: false,
            ..EstimateOptions::default()
        };

        let assessment = service.estimate(&potato(), &options).await;
        assert!(assessment.is_local());
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let service = SpoilageService::new(Arc::new(SpoilageRiskModel::new()));
        let lettuce = Observation::builder("lettuce")
            .temperature_c(2.0)
            .humidity_pct(98.0)
            .days_since_harvest(1)
            .build()
            .unwrap();

        let scores: Vec<u8> = service
            .estimate_batch(&[potato(), lettuce, potato()], &EstimateOptions::default())
            .await
            .iter()
            .map(RiskAssessment::risk_score)
            .collect();
        assert_eq!(scores, vec![11, 14, 11]);
    }

    #[test]
    fn settings_overrides_reach_the_model() {
        let mut settings = SpoilageSettings::default();
        settings
            .risk_multiplier_overrides
            .insert("potato".to_string(), 1.0);
        let service = SpoilageService::from_settings(&settings).unwrap();
        assert!(!service.has_backend());
        // 22.5 * 1.0
        assert_eq!(service.model().risk_score(&potato()), 23);
    }
}
