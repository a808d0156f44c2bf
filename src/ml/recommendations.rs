//! Storage and handling recommendations attached to each assessment.
//!
//! Local assessments get advice built from the observation itself. External
//! assessments get advice keyed on the tier the remote model reported.

use super::reference_tables::ReferenceTables;
use super::spoilage_model::{round_half_up, Audience, Observation, RiskTier};

// Opening block thresholds; independent of the display threshold profile.
const URGENT_ABOVE: u8 = 50;
const MONITOR_ABOVE: u8 = 25;

const TEMPERATURE_DEVIATION_LIMIT_C: f64 = 5.0;
const EXTENDED_STORAGE_DAYS: u32 = 7;
const LONG_TRANSPORT_HOURS: f64 = 24.0;
const LOW_CONFIDENCE_PCT: f64 = 70.0;

fn opening_block(risk_score: u8, audience: Audience) -> &'static [&'static str] {
    match (audience, risk_score) {
        (Audience::Supplier, s) if s > URGENT_ABOVE => &[
            "High spoilage risk detected! Consider immediate sale or processing.",
            "Implement enhanced cold chain management.",
            "Market this batch as 'quick sale' items with discounted pricing.",
        ],
        (Audience::Supplier, s) if s > MONITOR_ABOVE => &[
            "Monitor conditions closely and prioritize this batch for distribution.",
            "Consider upgrading packaging quality.",
            "Expedite transportation to reduce shelf time.",
        ],
        (Audience::Supplier, _) => &[
            "Low spoilage risk - product is in excellent condition.",
            "Suitable for extended storage or long-distance transport.",
            "Premium pricing recommended for high-quality produce.",
        ],
        (Audience::Customer, s) if s > URGENT_ABOVE => &[
            "High spoilage risk detected! Consider immediate sale or processing.",
            "Implement enhanced cold chain management.",
        ],
        (Audience::Customer, s) if s > MONITOR_ABOVE => &[
            "Monitor conditions closely and prioritize this batch.",
            "Consider upgrading packaging quality.",
        ],
        (Audience::Customer, _) => &[
            "Low spoilage risk - product is in good condition.",
            "Suitable for extended storage or long-distance transport.",
        ],
    }
}

/// Recommendations for a locally scored observation, most urgent first.
pub fn for_observation(
    risk_score: u8,
    observation: &Observation,
    tables: &ReferenceTables,
    audience: Audience,
) -> Vec<String> {
    let mut recommendations: Vec<String> = opening_block(risk_score, audience)
        .iter()
        .map(|s| s.to_string())
        .collect();

    let optimal = tables.optimal_temperature(observation.commodity_name());
    if (observation.temperature_c() - optimal).abs() > TEMPERATURE_DEVIATION_LIMIT_C {
        recommendations.push(format!(
            "Adjust temperature closer to {optimal}°C for optimal storage."
        ));
    }

    if observation.days_since_harvest() > EXTENDED_STORAGE_DAYS {
        recommendations.push(
            match audience {
                Audience::Supplier => {
                    "Product has been in storage for extended period - prioritize for sale."
                }
                Audience::Customer => {
                    "Product has been stored for extended period - prioritize sale."
                }
            }
            .to_string(),
        );
    }

    if audience == Audience::Supplier
        && observation.transport_duration_hours() > LONG_TRANSPORT_HOURS
    {
        recommendations
            .push("Long transport duration detected - consider local markets first.".to_string());
    }

    recommendations
}

fn external_block(tier: RiskTier, audience: Audience) -> &'static [&'static str] {
    match (audience, tier) {
        (Audience::Supplier, RiskTier::High) => &[
            "HIGH SPOILAGE RISK! Immediate action required.",
            "Emergency sale, processing, or donation recommended.",
            "Market as 'quick sale' with discounted pricing.",
            "Implement maximum cold chain protocols.",
        ],
        (Audience::Supplier, RiskTier::Medium) => &[
            "Medium risk detected - prioritize for distribution.",
            "Expedite transportation to reduce storage time.",
            "Consider upgrading storage conditions.",
            "Standard pricing with quick turnover strategy.",
        ],
        (Audience::Supplier, RiskTier::Low) => &[
            "Low spoilage risk - product is in excellent condition.",
            "Suitable for extended storage or long-distance transport.",
            "Premium pricing recommended for high-quality produce.",
            "Market as premium quality items.",
        ],
        (Audience::Customer, RiskTier::High) => &[
            "HIGH SPOILAGE RISK! Immediate action required.",
            "Consider emergency sale, processing, or donation.",
            "Implement maximum cold chain protocols.",
        ],
        (Audience::Customer, RiskTier::Medium) => &[
            "Medium risk detected - monitor conditions closely.",
            "Consider upgrading storage conditions.",
            "Prioritize this batch for early distribution.",
        ],
        (Audience::Customer, RiskTier::Low) => &[
            "Low spoilage risk - product is in good condition.",
            "Suitable for extended storage or long-distance transport.",
            "Optimal conditions maintained.",
        ],
    }
}

/// Recommendations for an assessment produced by the prediction service.
/// The confidence check uses the same whole percentage that is displayed.
pub fn for_external_prediction(
    reported_tier: RiskTier,
    shelf_life_days: Option<u32>,
    confidence: f64,
    model_version: Option<&str>,
    audience: Audience,
) -> Vec<String> {
    let mut recommendations: Vec<String> = external_block(reported_tier, audience)
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(days) = shelf_life_days {
        recommendations.push(format!("Estimated shelf life: {days} days"));
    }
    let confidence_pct = round_half_up((confidence * 100.0).clamp(0.0, 100.0));
    recommendations.push(format!("Model confidence: {confidence_pct}%"));

    if audience == Audience::Supplier {
        if confidence_pct < LOW_CONFIDENCE_PCT {
            recommendations.push("Lower confidence - consider additional quality checks.".to_string());
        }
        if let Some(version) = model_version {
            recommendations.push(format!("Prediction powered by ML Model {version}"));
        }
    }

    recommendations
}
