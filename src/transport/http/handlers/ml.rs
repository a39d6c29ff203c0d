use crate::app::ml_pipeline::DEFAULT_TARGET;
use crate::domain::auth::Permission;
use crate::domain::ml::FeatureInput;
use crate::transport::http::error::ApiError;
use crate::transport::http::extract::AuthUser;
use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{
    json_422, ApiResponse, AppState, PredictionRequest, TrainRequest, TrainingDataQuery,
};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

fn example_inputs() -> Vec<FeatureInput> {
    vec![
        FeatureInput {
            title: Some("Example Book".to_string()),
            price: Some(25.99),
            rating: Some(4.0),
            category: Some("Fiction".to_string()),
            availability: Some("In stock".to_string()),
        },
        FeatureInput {
            title: Some("Another Book".to_string()),
            price: Some(15.50),
            rating: Some(3.0),
            category: Some("Science".to_string()),
            availability: Some("In stock".to_string()),
        },
    ]
}

#[utoipa::path(
    get,
    path = "/api/v1/ml/features",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Feature table with per-feature statistics", body = ApiResponse),
        (status = 400, description = "No records available", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse)
    )
)]
pub async fn features_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    user.require(Permission::Ml)?;
    let prepared = state.pipeline.lock().await.prepare_features()?;
    ok(prepared)
}

#[utoipa::path(
    get,
    path = "/api/v1/ml/training-data",
    security(("bearer_auth" = [])),
    params(TrainingDataQuery),
    responses(
        (status = 200, description = "Scaled 80/20 train/test partitions", body = ApiResponse),
        (status = 400, description = "No records, or an unknown or non-numeric target", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse)
    )
)]
pub async fn training_data_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TrainingDataQuery>,
) -> Result<Response, ApiError> {
    user.require(Permission::Ml)?;
    let target = query.target.unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let data = state.pipeline.lock().await.prepare_training_data(&target)?;
    ok(data)
}

#[utoipa::path(
    post,
    path = "/api/v1/ml/train",
    security(("bearer_auth" = [])),
    request_body = TrainRequest,
    responses(
        (status = 200, description = "Model trained", body = ApiResponse),
        (status = 400, description = "No records, unknown or non-numeric target, or too few records", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn train_handler(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let claims = user.require(Permission::Ml)?;
    let request = match train_request(&headers, &body) {
        Ok(v) => v,
        Err(resp) => return Ok(resp.into_response()),
    };
    let target = request
        .target
        .unwrap_or_else(|| DEFAULT_TARGET.to_string());
    info!("Training requested by {} on '{}'", claims.username, target);

    // Fitting is CPU-bound; keep it off the async workers.
    let pipeline = Arc::clone(&state.pipeline);
    let report = tokio::task::spawn_blocking(move || {
        let mut pipeline = pipeline.blocking_lock();
        pipeline.train(&target)
    })
    .await
    .map_err(anyhow::Error::from)??;
    ok(report)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// The body is optional; a present one must be a JSON `TrainRequest`.
fn train_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<TrainRequest, (StatusCode, Json<ApiResponse>)> {
    const EXPECTED: &str = r#"{"target": "rating"} or an empty body"#;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TrainRequest::default());
    }
    if !is_json(headers) {
        return Err(json_422(
            "Expected request with `Content-Type: application/json`",
            EXPECTED,
        ));
    }
    Json::<TrainRequest>::from_bytes(body)
        .map(|Json(request)| request)
        .map_err(|e| json_422(e, EXPECTED))
}

#[utoipa::path(
    post,
    path = "/api/v1/ml/predictions",
    security(("bearer_auth" = [])),
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "One prediction per input", body = ApiResponse),
        (status = 400, description = "Model not trained", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn predictions_handler(
    State(state): State<AppState>,
    user: AuthUser,
    request: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    user.require(Permission::Ml)?;
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return Ok(json_422(e, r#"{"data": [{"title": ..., "price": ..., ...}]}"#).into_response())
        }
    };
    let batch = state.pipeline.lock().await.predict(&request.data)?;
    ok(batch)
}

#[utoipa::path(
    get,
    path = "/api/v1/ml/model-info",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pipeline state and held model", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse)
    )
)]
pub async fn model_info_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    user.require(Permission::Ml)?;
    let info = state.pipeline.lock().await.model_info();
    ok(info)
}

#[utoipa::path(
    post,
    path = "/api/v1/ml/reset",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pipeline reset; records reload on next use", body = ApiResponse),
        (status = 403, description = "ml permission required", body = ApiResponse)
    )
)]
pub async fn reset_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let claims = user.require(Permission::Ml)?;
    state.pipeline.lock().await.reset();
    info!("ML pipeline reset by {}", claims.username);
    ok(json!({ "message": "ML pipeline reset" }))
}

#[utoipa::path(
    get,
    path = "/api/v1/ml/example-prediction",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sample request for the predictions endpoint", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse)
    )
)]
pub async fn example_prediction_handler(_user: AuthUser) -> Result<Response, ApiError> {
    ok(json!({
        "method": "POST",
        "endpoint": "/api/v1/ml/predictions",
        "headers": {
            "Authorization": "Bearer <your-jwt-token>",
            "Content-Type": "application/json"
        },
        "body": { "data": example_inputs() },
        "note": "Train the model first with POST /api/v1/ml/train"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn blank_train_body_uses_default_target() {
        let request = train_request(&HeaderMap::new(), b"  ").unwrap();
        assert!(request.target.is_none());
    }

    #[test]
    fn train_body_target_is_read() {
        let request = train_request(&json_headers(), br#"{"target": "price"}"#).unwrap();
        assert_eq!(request.target.as_deref(), Some("price"));
    }

    #[test]
    fn mistyped_or_untyped_train_body_is_rejected() {
        let (status, _) = train_request(&json_headers(), br#"{"target": 5}"#).unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, Json(body)) =
            train_request(&HeaderMap::new(), br#"{"target": "price"}"#).unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code.as_deref(), Some("invalid_body"));
    }
}
