use crate::domain::auth::Permission;
use crate::domain::catalog::BOOK_COLUMNS;
use crate::storage::catalog::inspect_books;
use crate::transport::http::error::ApiError;
use crate::transport::http::extract::AuthUser;
use crate::transport::http::handlers::common::{ok, respond};
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde_json::json;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/v1/scraping/trigger",
    security(("bearer_auth" = [])),
    responses(
        (status = 202, description = "Scrape started in the background", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 403, description = "Admin permission required", body = ApiResponse),
        (status = 409, description = "A scrape is already running", body = ApiResponse)
    )
)]
pub async fn trigger_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let claims = user.require(Permission::Admin)?;
    let started_at = state
        .scrape_job
        .spawn(state.scrape_runner.clone())
        .await?;
    info!("Scrape triggered by {}", claims.username);
    respond(
        StatusCode::ACCEPTED,
        json!({
            "status": "running",
            "started_at": started_at,
            "note": "Poll GET /api/v1/scraping/status for progress"
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/scraping/status",
    responses((status = 200, description = "Current job status", body = ApiResponse))
)]
pub async fn status_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let status = state.scrape_job.status().await;
    ok(json!({
        "status": status,
        "data_file_exists": state.config.data_path.exists(),
        "timestamp": Utc::now(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/scraping/history",
    responses((status = 200, description = "Finished runs, oldest first", body = ApiResponse))
)]
pub async fn history_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let history = state.scrape_job.history().await;
    ok(json!({
        "total_executions": history.len(),
        "history": history,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/scraping/data-info",
    responses(
        (status = 200, description = "Summary of the catalog file on disk", body = ApiResponse),
        (status = 404, description = "Catalog file not found; run a scrape first", body = ApiResponse)
    )
)]
pub async fn data_info_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = &state.config.data_path;
    if !path.exists() {
        return Err(ApiError::NotFound(format!(
            "Data file {} not found; run a scrape first",
            path.display()
        )));
    }
    ok(inspect_books(path)?)
}

#[utoipa::path(
    get,
    path = "/api/v1/scraping/config",
    responses((status = 200, description = "Effective scraper settings", body = ApiResponse))
)]
pub async fn config_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scraper = &state.config.scraper;
    ok(json!({
        "target_url": scraper.base_url,
        "output_path": state.config.data_path.display().to_string(),
        "output_format": "CSV",
        "max_pages": scraper.max_pages,
        "timeout_seconds": scraper.timeout_secs,
        "page_delay_ms": scraper.page_delay_ms,
        "max_consecutive_failures": scraper.max_consecutive_failures,
        "request_timeout_seconds": scraper.request_timeout_secs,
        "fields_collected": BOOK_COLUMNS,
    }))
}
