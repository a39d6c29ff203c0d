use crate::app::ml_pipeline::PipelineError;
use crate::app::scrape_job::ScrapeError;
use crate::domain::auth::AuthError;
use crate::domain::catalog::CatalogError;
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can return, rendered as an `ApiResponse` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
                AuthError::Hashing(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            ApiError::Pipeline(_) => StatusCode::BAD_REQUEST,
            ApiError::Scrape(e) => match e {
                ScrapeError::AlreadyRunning => StatusCode::CONFLICT,
                ScrapeError::Timeout(_) | ScrapeError::Failed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(e) => e.code(),
            ApiError::Pipeline(e) => e.code(),
            ApiError::Scrape(e) => e.code(),
            ApiError::Catalog(_) => "data_unavailable",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let mut body = ApiResponse::failure(self.to_string(), self.code());
        if let ApiError::Auth(AuthError::Forbidden { granted, .. }) = &self {
            body.data = Some(serde_json::json!({ "granted_permissions": granted }));
        }
        (status, Json(body)).into_response()
    }
}
