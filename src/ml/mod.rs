/*!
 * # Spoilage Estimation Module
 *
 * Local spoilage risk estimation for surplus-food listings: the scoring model,
 * its commodity reference data, recommendation rules, the commodity catalog
 * and date-based listing freshness.
 */

/// Commodity catalog grouped by category
pub mod catalog;

/// Date-based listing freshness
pub mod listing;

/// Recommendation text for local and external assessments
pub mod recommendations;

/// Per-commodity reference data
pub mod reference_tables;

/// Deterministic spoilage risk model
pub mod spoilage_model;

pub use reference_tables::{CommodityProfile, ReferenceTables, SuggestedConditions};
pub use spoilage_model::{
    AssessmentSource, Audience, EstimateOptions, Observation, ObservationBuilder, RiskAssessment,
    RiskTier, ScoreBreakdown, SpoilageRiskModel, StorageType, ThresholdProfile,
};
