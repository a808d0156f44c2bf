use crate::{
    ml::{
        catalog::{self, CommodityCategory},
        reference_tables::CommodityProfile,
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub categories: Vec<CommodityCategory>,
    pub total_categories: usize,
    pub total_commodities: usize,
}

/// Commodity catalog grouped by category
pub async fn list_commodities() -> Json<ApiResponse<CatalogResponse>> {
    let categories = catalog::categories();
    Json(ApiResponse::success(CatalogResponse {
        total_categories: categories.len(),
        total_commodities: catalog::commodity_count(),
        categories,
    }))
}

/// Reference profile for one commodity. Unknown names get the default
/// profile with `known: false` rather than a 404.
pub async fn get_commodity(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ApiResponse<CommodityProfile>> {
    Json(ApiResponse::success(
        state.spoilage.model().tables().profile(&name),
    ))
}
