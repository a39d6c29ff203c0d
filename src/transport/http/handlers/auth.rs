use crate::domain::auth::Permission;
use crate::transport::http::error::ApiError;
use crate::transport::http::extract::AuthUser;
use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{json_422, ApiResponse, AppState, LoginRequest, RefreshRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse),
        (status = 401, description = "Invalid username or password", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return Ok(json_422(e, r#"{"username": "...", "password": "..."}"#).into_response())
        }
    };
    let grant = state
        .auth
        .authenticate(request.username.trim(), &request.password)
        .await?;
    ok(grant)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token re-issued with a fresh expiry", body = ApiResponse),
        (status = 401, description = "Token invalid or expired", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    request: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return Ok(json_422(e, r#"{"token": "..."}"#).into_response()),
    };
    ok(state.auth.refresh(request.token.trim())?)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ApiResponse)
    )
)]
pub async fn verify_handler(user: AuthUser) -> Result<Response, ApiError> {
    let claims = user.0;
    ok(json!({
        "valid": true,
        "user": claims.profile(),
        "expires_at": claims.exp,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Known users and their permissions", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 403, description = "Admin permission required", body = ApiResponse)
    )
)]
pub async fn list_users_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    user.require(Permission::Admin)?;
    let users = state.auth.list_users().await;
    ok(json!({ "total": users.len(), "users": users }))
}
