use crate::transport::http::error::ApiError;
use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{ApiResponse, AppState, HealthResponse};
use axum::extract::State;
use axum::response::Response;
use serde_json::json;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service index", body = ApiResponse))
)]
pub async fn index_handler() -> Result<Response, ApiError> {
    ok(json!({
        "message": "Books API",
        "version": API_VERSION,
        "documentation": "/api/docs",
        "endpoints": {
            "books": "/api/v1/books",
            "categories": "/api/v1/categories",
            "stats": "/api/v1/stats",
            "health": "/api/v1/health",
            "auth": "/api/v1/auth",
            "ml": "/api/v1/ml",
            "scraping": "/api/v1/scraping"
        }
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is healthy", body = ApiResponse))
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let total_books_loaded = state.catalog.read().await.len();
    ok(HealthResponse {
        status: "healthy".to_string(),
        total_books_loaded,
        version: API_VERSION.to_string(),
    })
}
