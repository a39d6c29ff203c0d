use crate::app::ml_pipeline::{
    ModelInfo, PipelineState, Prediction, PredictionBatch, PreparedFeatures, TrainingData,
    TrainingMetrics, TrainingReport,
};
use crate::app::scrape_job::{ScrapeRun, ScrapeStatus};
use crate::domain::auth::{Claims, Permission, TokenGrant, UserProfile};
use crate::domain::catalog::{Book, CategoryStats, StatsOverview};
use crate::domain::ml::{FeatureInput, Summary};
use crate::storage::catalog::{DataFileInfo, PriceRange};
use crate::transport::http::handlers::{auth, books, health, ml, scraping, stats};
use crate::transport::http::types::{
    ApiResponse, AppState, CategoriesResponse, HealthResponse, LoginRequest, PredictionRequest,
    RefreshRequest, ReloadResponse, TrainRequest,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Books API", description = "Book catalog, statistics, ML pipeline and scraping"),
    paths(
        health::index_handler,
        health::healthcheck_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::search_books_handler,
        books::top_rated_handler,
        books::price_range_handler,
        books::reload_books_handler,
        books::list_categories_handler,
        stats::stats_overview_handler,
        stats::stats_categories_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::verify_handler,
        auth::list_users_handler,
        ml::features_handler,
        ml::training_data_handler,
        ml::train_handler,
        ml::predictions_handler,
        ml::model_info_handler,
        ml::reset_handler,
        ml::example_prediction_handler,
        scraping::trigger_handler,
        scraping::status_handler,
        scraping::history_handler,
        scraping::data_info_handler,
        scraping::config_handler
    ),
    components(schemas(
        ApiResponse,
        Book,
        StatsOverview,
        CategoryStats,
        CategoriesResponse,
        ReloadResponse,
        HealthResponse,
        LoginRequest,
        RefreshRequest,
        TokenGrant,
        UserProfile,
        Claims,
        Permission,
        TrainRequest,
        PredictionRequest,
        FeatureInput,
        Summary,
        PreparedFeatures,
        TrainingData,
        TrainingMetrics,
        TrainingReport,
        Prediction,
        PredictionBatch,
        ModelInfo,
        PipelineState,
        ScrapeStatus,
        ScrapeRun,
        DataFileInfo,
        PriceRange
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index_handler))
        .route("/api/v1/health", get(health::healthcheck_handler))
        .route("/api/v1/books", get(books::list_books_handler))
        .route("/api/v1/books/search", get(books::search_books_handler))
        .route("/api/v1/books/top-rated", get(books::top_rated_handler))
        .route("/api/v1/books/price-range", get(books::price_range_handler))
        .route("/api/v1/books/reload", post(books::reload_books_handler))
        .route("/api/v1/books/:id", get(books::get_book_handler))
        .route("/api/v1/categories", get(books::list_categories_handler))
        .route("/api/v1/stats/overview", get(stats::stats_overview_handler))
        .route("/api/v1/stats/categories", get(stats::stats_categories_handler))
        .route("/api/v1/auth/login", post(auth::login_handler))
        .route("/api/v1/auth/refresh", post(auth::refresh_handler))
        .route("/api/v1/auth/verify", get(auth::verify_handler))
        .route("/api/v1/auth/users", get(auth::list_users_handler))
        .route("/api/v1/ml/features", get(ml::features_handler))
        .route("/api/v1/ml/training-data", get(ml::training_data_handler))
        .route("/api/v1/ml/train", post(ml::train_handler))
        .route("/api/v1/ml/predictions", post(ml::predictions_handler))
        .route("/api/v1/ml/model-info", get(ml::model_info_handler))
        .route("/api/v1/ml/reset", post(ml::reset_handler))
        .route(
            "/api/v1/ml/example-prediction",
            get(ml::example_prediction_handler),
        )
        .route("/api/v1/scraping/trigger", post(scraping::trigger_handler))
        .route("/api/v1/scraping/status", get(scraping::status_handler))
        .route("/api/v1/scraping/history", get(scraping::history_handler))
        .route("/api/v1/scraping/data-info", get(scraping::data_info_handler))
        .route("/api/v1/scraping/config", get(scraping::config_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/books/{id}"));
        assert!(doc.paths.paths.contains_key("/api/v1/ml/predictions"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
