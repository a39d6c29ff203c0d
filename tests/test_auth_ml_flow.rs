//! Token lifecycle and the permission-gated ML pipeline over HTTP.

mod common;

use common::{training_catalog, CannedPages, TestApp};
use serde_json::json;
use std::sync::Arc;

async fn app() -> TestApp {
    TestApp::spawn(Some(training_catalog()), Arc::new(CannedPages::default())).await
}

#[tokio::test]
async fn login_verify_and_refresh() {
    let app = app().await;

    let resp = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], json!("invalid_credentials"));

    let token = app.login("scientist", "science123").await;
    let (status, body) = app.get_auth("/api/v1/auth/verify", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"]["username"], json!("scientist"));
    assert_eq!(body["data"]["user"]["permissions"], json!(["read", "ml"]));

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["expires_in"], json!("24 hours"));
}

#[tokio::test]
async fn bearer_header_errors_are_distinguished() {
    let app = app().await;

    let (status, body) = app.get("/api/v1/auth/verify").await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], json!("missing_token"));

    let resp = app
        .client
        .get(app.url("/api/v1/auth/verify"))
        .header("Authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], json!("malformed_header"));

    let (status, body) = app.get_auth("/api/v1/auth/verify", "not.a.jwt").await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], json!("invalid_token"));
}

#[tokio::test]
async fn user_listing_is_admin_only() {
    let app = app().await;

    let scientist = app.login("scientist", "science123").await;
    let (status, body) = app.get_auth("/api/v1/auth/users", &scientist).await;
    assert_eq!(status, 403);
    assert_eq!(
        body["data"]["granted_permissions"],
        json!(["read", "ml"])
    );

    let admin = app.login("admin", "admin123").await;
    let (status, body) = app.get_auth("/api/v1/auth/users", &admin).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], json!(3));
}

#[tokio::test]
async fn ml_endpoints_require_ml_permission() {
    let app = app().await;
    let user = app.login("user", "user123").await;

    let (status, body) = app.get_auth("/api/v1/ml/features", &user).await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], json!("forbidden"));

    // Any valid token may read the example request.
    let (status, body) = app.get_auth("/api/v1/ml/example-prediction", &user).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["body"]["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn train_predict_reset_cycle() {
    let app = app().await;
    let token = app.login("scientist", "science123").await;

    let (status, body) = app.get_auth("/api/v1/ml/features", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["shape"], json!([30, 9]));

    let (status, body) = app
        .get_auth("/api/v1/ml/training-data?target=price", &token)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["train_size"], json!(24));
    assert_eq!(body["data"]["test_size"], json!(6));

    let (status, body) = app
        .get_auth("/api/v1/ml/training-data?target=title", &token)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("non_numeric_target"));

    let input = json!({ "data": [
        { "title": "New Arrival", "price": 24.0, "rating": 4, "category": "Unheard Of", "availability": "In stock" }
    ]});
    let (status, body) = app.post_auth("/api/v1/ml/predictions", &token, input.clone()).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("model_not_trained"));

    let (status, body) = app
        .post_auth("/api/v1/ml/train", &token, json!({ "target": "rating" }))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["model_trained"], json!(true));
    assert_eq!(body["data"]["model_type"], json!("RandomForestRegressor"));
    assert_eq!(
        body["data"]["feature_importance"].as_object().unwrap().len(),
        9
    );

    let (status, body) = app.post_auth("/api/v1/ml/predictions", &token, input.clone()).await;
    assert_eq!(status, 200);
    let prediction = &body["data"]["predictions"][0];
    assert!(prediction["prediction"].as_f64().unwrap().is_finite());
    let confidence = prediction["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence <= 1.0);
    assert_eq!(prediction["input_data"]["category"], json!("Unheard Of"));

    let (_, body) = app.get_auth("/api/v1/ml/model-info", &token).await;
    assert_eq!(body["data"]["state"], json!("trained"));
    assert_eq!(body["data"]["target_column"], json!("rating"));

    let (status, _) = app.post_auth("/api/v1/ml/reset", &token, json!({})).await;
    assert_eq!(status, 200);

    let (status, body) = app.post_auth("/api/v1/ml/predictions", &token, input).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("model_not_trained"));
}

#[tokio::test]
async fn malformed_prediction_body_is_422() {
    let app = app().await;
    let token = app.login("scientist", "science123").await;

    let (status, body) = app
        .post_auth("/api/v1/ml/predictions", &token, json!({ "rows": [] }))
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], json!("invalid_body"));
}

#[tokio::test]
async fn empty_catalog_is_a_client_error() {
    let app = TestApp::spawn(Some(Vec::new()), Arc::new(CannedPages::default())).await;
    let token = app.login("scientist", "science123").await;

    let (status, body) = app.get_auth("/api/v1/ml/features", &token).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("no_data"));

    let (status, body) = app
        .post_auth("/api/v1/ml/train", &token, json!({ "target": "rating" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("no_data"));
}

#[tokio::test]
async fn train_body_is_optional_but_validated() {
    let app = app().await;
    let token = app.login("scientist", "science123").await;

    let (status, body) = app
        .post_auth("/api/v1/ml/train", &token, json!({ "target": 5 }))
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], json!("invalid_body"));

    let resp = app
        .client
        .post(app.url("/api/v1/ml/train"))
        .bearer_auth(&token)
        .header("Content-Type", "text/plain")
        .body(r#"{"target": "price"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    // Nothing was trained by the rejected requests.
    let (_, body) = app.get_auth("/api/v1/ml/model-info", &token).await;
    assert_eq!(body["data"]["model_trained"], json!(false));

    let resp = app
        .client
        .post(app.url("/api/v1/ml/train"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["target_column"], json!("rating"));
}
