use crate::transport::http::error::ApiError;
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Wraps `data` in a success envelope with the given status.
pub fn respond<T: Serialize>(status: StatusCode, data: T) -> Result<Response, ApiError> {
    let value = serde_json::to_value(data).map_err(anyhow::Error::from)?;
    Ok((status, Json(ApiResponse::ok(value))).into_response())
}

pub fn ok<T: Serialize>(data: T) -> Result<Response, ApiError> {
    respond(StatusCode::OK, data)
}
