use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, parse_json},
    ml::{
        listing::{assess_listing, ListingFreshness},
        spoilage_model::ThresholdProfile,
    },
    ApiResponse,
};
use axum::{extract::rejection::JsonRejection, response::Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

/// Listing dates; `today` defaults to the current UTC date
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRiskRequest {
    pub harvest_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub today: Option<NaiveDate>,
    /// Inventory cards use the tighter profile unless told otherwise
    #[serde(default)]
    pub threshold_profile: Option<ThresholdProfile>,
}

pub async fn listing_risk(
    payload: Result<Json<ListingRiskRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ListingFreshness>>, ApiError> {
    let payload = parse_json(payload)?;
    let today = payload.today.unwrap_or_else(|| Utc::now().date_naive());
    let profile = payload
        .threshold_profile
        .unwrap_or(ThresholdProfile::Inventory);

    let freshness = assess_listing(payload.harvest_date, payload.expiry_date, today, profile)
        .map_err(map_service_error)?;

    Ok(Json(ApiResponse::success(freshness)))
}
