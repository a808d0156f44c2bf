//! Freshness of marketplace listings from their harvest and expiry dates.

use super::spoilage_model::{RiskTier, ThresholdProfile};
use crate::errors::ServiceError;
use chrono::NaiveDate;
use serde::Serialize;

/// Listings this close to expiry are flagged as expiring
pub const EXPIRING_WITHIN_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Expiring,
    Expired,
}

/// Whole days from `today` until `expiry`; negative once expired.
pub fn days_until_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

pub fn listing_status(expiry: NaiveDate, today: NaiveDate) -> ListingStatus {
    match days_until_expiry(expiry, today) {
        d if d <= 0 => ListingStatus::Expired,
        d if d <= EXPIRING_WITHIN_DAYS => ListingStatus::Expiring,
        _ => ListingStatus::Active,
    }
}

/// Share of the harvest-to-expiry window already used up, as a 0-100 score.
pub fn listing_risk(
    harvest: NaiveDate,
    expiry: NaiveDate,
    today: NaiveDate,
) -> Result<u8, ServiceError> {
    let total = (expiry - harvest).num_days();
    if total <= 0 {
        return Err(ServiceError::invalid_observation(
            "expiry date must be after harvest date",
        ));
    }

    let elapsed = (today - harvest).num_days();
    let ratio = elapsed as f64 / total as f64 * 100.0;
    Ok(super::spoilage_model::round_half_up(ratio).clamp(0.0, 100.0) as u8)
}

/// Date-based freshness summary for one listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingFreshness {
    pub risk_score: u8,
    pub risk_tier: RiskTier,
    pub risk_color: &'static str,
    pub days_until_expiry: i64,
    pub status: ListingStatus,
}

pub fn assess_listing(
    harvest: NaiveDate,
    expiry: NaiveDate,
    today: NaiveDate,
    profile: ThresholdProfile,
) -> Result<ListingFreshness, ServiceError> {
    let risk_score = listing_risk(harvest, expiry, today)?;
    let risk_tier = profile.classify(risk_score);

    Ok(ListingFreshness {
        risk_score,
        risk_tier,
        risk_color: risk_tier.color(),
        days_until_expiry: days_until_expiry(expiry, today),
        status: listing_status(expiry, today),
    })
}
