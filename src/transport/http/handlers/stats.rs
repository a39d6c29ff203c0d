use crate::transport::http::error::ApiError;
use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::response::Response;

#[utoipa::path(
    get,
    path = "/api/v1/stats/overview",
    responses((status = 200, description = "Collection-wide statistics", body = ApiResponse))
)]
pub async fn stats_overview_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let overview = state.catalog.read().await.stats_overview();
    ok(overview)
}

#[utoipa::path(
    get,
    path = "/api/v1/stats/categories",
    responses((status = 200, description = "Statistics per category", body = ApiResponse))
)]
pub async fn stats_categories_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let by_category = state.catalog.read().await.stats_by_category();
    ok(by_category)
}
