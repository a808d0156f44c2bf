/*!
 * # Spoilage Risk Model
 *
 * Deterministic fallback estimator used whenever the external prediction
 * service is not configured or cannot answer. It scores an observation from
 * its deviation from the commodity's optimal storage conditions, its age,
 * transport time and storage type, then scales by a per-commodity multiplier.
 *
 * The model is pure: no I/O, no clock and no randomness. It is `Send + Sync`
 * and shared across request handlers behind an `Arc`.
 */

use super::recommendations;
use super::reference_tables::ReferenceTables;
use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Confidence reported for every locally computed assessment
pub const LOCAL_CONFIDENCE: f64 = 0.8;

const TEMPERATURE_WEIGHT: f64 = 2.0;
const HUMIDITY_WEIGHT: f64 = 0.5;
const DAYS_WEIGHT: f64 = 3.0;
const TRANSPORT_WEIGHT: f64 = 0.5;

/// How the batch is being stored
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StorageType {
    #[default]
    ColdStorage,
    #[strum(to_string = "ambient", serialize = "room_temperature")]
    Ambient,
    ControlledAtmosphere,
}

impl StorageType {
    /// Parses user input, treating anything unrecognized as cold storage.
    pub fn parse_lenient(value: &str) -> Self {
        value
            .trim()
            .replace([' ', '-'], "_")
            .parse()
            .unwrap_or_default()
    }

    /// Score points added for this storage type.
    pub fn adjustment(self) -> f64 {
        match self {
            StorageType::ColdStorage => 0.0,
            StorageType::Ambient => 10.0,
            StorageType::ControlledAtmosphere => -5.0,
        }
    }

    /// Storage type vocabulary understood by the prediction service.
    pub fn wire_value(self) -> &'static str {
        match self {
            StorageType::ColdStorage | StorageType::ControlledAtmosphere => "cold_storage",
            StorageType::Ambient => "room_temperature",
        }
    }
}

/// Coarse risk bucket derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }

    /// Display colour shared by every threshold profile.
    pub fn color(self) -> &'static str {
        match self {
            RiskTier::Low => "#10b981",
            RiskTier::Medium => "#f59e0b",
            RiskTier::High => "#ef4444",
        }
    }

    /// Maps a textual interpretation such as "High Risk" back to a tier.
    pub fn from_interpretation(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.strip_suffix(" risk").unwrap_or(normalized.as_str()) {
            "low" => Some(RiskTier::Low),
            "medium" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            _ => None,
        }
    }

    /// Maps the numeric class 0/1/2 to a tier.
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(RiskTier::Low),
            1 => Some(RiskTier::Medium),
            2 => Some(RiskTier::High),
            _ => None,
        }
    }
}

/// Named score thresholds. Dashboards and inventory cards historically used
/// different cut-offs; both are kept and selected explicitly.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ThresholdProfile {
    /// Low <= 25, Medium <= 50, High above
    #[default]
    Dashboard,
    /// Low <= 15, Medium <= 30, High above
    Inventory,
}

impl ThresholdProfile {
    /// Inclusive upper bounds of the Low and Medium tiers.
    pub fn bounds(self) -> (u8, u8) {
        match self {
            ThresholdProfile::Dashboard => (25, 50),
            ThresholdProfile::Inventory => (15, 30),
        }
    }

    pub fn classify(self, score: u8) -> RiskTier {
        let (low, medium) = self.bounds();
        if score <= low {
            RiskTier::Low
        } else if score <= medium {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn color_for(self, score: u8) -> &'static str {
        self.classify(score).color()
    }
}

/// Who is reading the recommendations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Audience {
    #[default]
    Supplier,
    Customer,
}

/// A validated snapshot of one batch's storage and handling conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    commodity_name: String,
    temperature_c: f64,
    humidity_pct: f64,
    days_since_harvest: u32,
    storage_type: StorageType,
    transport_duration_hours: f64,
}

impl Observation {
    pub fn builder(commodity_name: impl Into<String>) -> ObservationBuilder {
        ObservationBuilder::new(commodity_name)
    }

    pub fn commodity_name(&self) -> &str {
        &self.commodity_name
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    pub fn humidity_pct(&self) -> f64 {
        self.humidity_pct
    }

    pub fn days_since_harvest(&self) -> u32 {
        self.days_since_harvest
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    pub fn transport_duration_hours(&self) -> f64 {
        self.transport_duration_hours
    }
}

/// Builder for [`Observation`]. Temperature, humidity and days since harvest
/// are required; storage defaults to cold storage and transport to zero hours.
#[derive(Debug, Clone, Default)]
pub struct ObservationBuilder {
    commodity_name: String,
    temperature_c: Option<f64>,
    humidity_pct: Option<f64>,
    days_since_harvest: Option<u32>,
    storage_type: StorageType,
    transport_duration_hours: f64,
}

impl ObservationBuilder {
    pub fn new(commodity_name: impl Into<String>) -> Self {
        Self {
            commodity_name: commodity_name.into(),
            ..Default::default()
        }
    }

    pub fn temperature_c(mut self, value: f64) -> Self {
        self.temperature_c = Some(value);
        self
    }

    pub fn humidity_pct(mut self, value: f64) -> Self {
        self.humidity_pct = Some(value);
        self
    }

    pub fn days_since_harvest(mut self, value: u32) -> Self {
        self.days_since_harvest = Some(value);
        self
    }

    pub fn storage_type(mut self, value: StorageType) -> Self {
        self.storage_type = value;
        self
    }

    pub fn transport_duration_hours(mut self, value: f64) -> Self {
        self.transport_duration_hours = value;
        self
    }

    pub fn build(self) -> Result<Observation, ServiceError> {
        let commodity_name = self.commodity_name.trim().to_string();
        if commodity_name.is_empty() {
            return Err(ServiceError::invalid_observation(
                "commodity name must not be blank",
            ));
        }

        let temperature_c = require_finite("temperature", self.temperature_c)?;
        let humidity_pct = require_finite("humidity", self.humidity_pct)?;
        let days_since_harvest = self.days_since_harvest.ok_or_else(|| {
            ServiceError::invalid_observation("days since harvest is required")
        })?;

        let transport_duration_hours =
            require_finite("transport duration", Some(self.transport_duration_hours))?;
        if transport_duration_hours < 0.0 {
            return Err(ServiceError::invalid_observation(
                "transport duration must not be negative",
            ));
        }

        Ok(Observation {
            commodity_name,
            temperature_c,
            humidity_pct,
            days_since_harvest,
            storage_type: self.storage_type,
            transport_duration_hours,
        })
    }
}

fn require_finite(field: &str, value: Option<f64>) -> Result<f64, ServiceError> {
    match value {
        None => Err(ServiceError::invalid_observation(format!(
            "{field} is required"
        ))),
        Some(v) if !v.is_finite() => Err(ServiceError::invalid_observation(format!(
            "{field} must be a finite number"
        ))),
        Some(v) => Ok(v),
    }
}

/// Where an assessment came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssessmentSource {
    LocalFallback,
    External {
        model_version: String,
        /// Tier as interpreted by the remote model; may disagree with the
        /// tier derived from the score under the selected profile.
        reported_tier: RiskTier,
    },
}

/// The outcome of one estimation
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    risk_score: u8,
    recommendations: Vec<String>,
    estimated_shelf_life_days: Option<u32>,
    confidence: f64,
    source: AssessmentSource,
    threshold_profile: ThresholdProfile,
}

impl RiskAssessment {
    pub(crate) fn new(
        risk_score: u8,
        recommendations: Vec<String>,
        estimated_shelf_life_days: Option<u32>,
        confidence: f64,
        source: AssessmentSource,
        threshold_profile: ThresholdProfile,
    ) -> Self {
        Self {
            risk_score: risk_score.min(100),
            recommendations,
            estimated_shelf_life_days,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            threshold_profile,
        }
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.threshold_profile.classify(self.risk_score)
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn estimated_shelf_life_days(&self) -> Option<u32> {
        self.estimated_shelf_life_days
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn source(&self) -> &AssessmentSource {
        &self.source
    }

    pub fn threshold_profile(&self) -> ThresholdProfile {
        self.threshold_profile
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, AssessmentSource::LocalFallback)
    }
}

/// Caller-selected policy for one estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateOptions {
    pub threshold_profile: ThresholdProfile,
    pub audience: Audience,
    pub include_shelf_life: bool,
    /// Ask the external prediction service first when one is configured
    pub prefer_external: bool,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            threshold_profile: ThresholdProfile::Dashboard,
            audience: Audience::Supplier,
            include_shelf_life: true,
            prefer_external: true,
        }
    }
}

/// Individual score contributions, before and after scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub temperature: f64,
    pub humidity: f64,
    pub age: f64,
    pub transport: f64,
    pub storage_adjustment: f64,
    pub multiplier: f64,
    /// Sum of contributions times the multiplier, unrounded
    pub raw_score: f64,
    pub risk_score: u8,
}

/// Rounds .5 upwards, matching how scores were always displayed.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn to_score(value: f64) -> u8 {
    if value.is_nan() {
        return 100;
    }
    round_half_up(value).clamp(0.0, 100.0) as u8
}

/// Shelf life implied by a score: ten points per day.
pub fn shelf_life_days(risk_score: u8) -> u32 {
    let remaining = 100 - u32::from(risk_score.min(100));
    round_half_up(f64::from(remaining) / 10.0) as u32
}

/// Local spoilage risk model
#[derive(Debug, Clone, Default)]
pub struct SpoilageRiskModel {
    tables: ReferenceTables,
}

impl SpoilageRiskModel {
    /// Model backed by the built-in reference tables
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: ReferenceTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn breakdown(&self, observation: &Observation) -> ScoreBreakdown {
        let commodity = observation.commodity_name();

        let temperature = (observation.temperature_c()
            - self.tables.optimal_temperature(commodity))
        .abs()
            * TEMPERATURE_WEIGHT;
        let humidity = (observation.humidity_pct() - self.tables.optimal_humidity(commodity))
            .abs()
            * HUMIDITY_WEIGHT;
        let age = f64::from(observation.days_since_harvest()) * DAYS_WEIGHT;
        let transport = observation.transport_duration_hours() * TRANSPORT_WEIGHT;
        let storage_adjustment = observation.storage_type().adjustment();
        let multiplier = self.tables.risk_multiplier(commodity);

        let raw_score =
            (temperature + humidity + age + transport + storage_adjustment) * multiplier;

        ScoreBreakdown {
            temperature,
            humidity,
            age,
            transport,
            storage_adjustment,
            multiplier,
            raw_score,
            risk_score: to_score(raw_score),
        }
    }

    pub fn risk_score(&self, observation: &Observation) -> u8 {
        self.breakdown(observation).risk_score
    }

    /// Scores the observation and attaches recommendations for the audience.
    pub fn estimate(&self, observation: &Observation, options: &EstimateOptions) -> RiskAssessment {
        let risk_score = self.risk_score(observation);
        let recommendations =
            recommendations::for_observation(risk_score, observation, &self.tables, options.audience);

        RiskAssessment::new(
            risk_score,
            recommendations,
            options
                .include_shelf_life
                .then(|| shelf_life_days(risk_score)),
            LOCAL_CONFIDENCE,
            AssessmentSource::LocalFallback,
            options.threshold_profile,
        )
    }
}
