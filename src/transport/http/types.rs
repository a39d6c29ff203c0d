use crate::app::ml_pipeline::MlPipeline;
use crate::app::scrape_job::{ScrapeJob, ScrapeRunner};
use crate::domain::auth::{AuthService, CredentialStore, InMemoryCredentialStore};
use crate::domain::catalog::{BookStore, CatalogSource};
use crate::domain::ml::FeatureInput;
use crate::infra::config::Config;
use crate::infra::scraper::{HttpPageSource, PageSource};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RwLock<BookStore>>,
    pub pipeline: Arc<Mutex<MlPipeline>>,
    pub auth: Arc<AuthService>,
    pub scrape_job: Arc<ScrapeJob>,
    pub scrape_runner: ScrapeRunner,
    pub config: Arc<Config>,
}

impl AppState {
    /// Production wiring: catalog file from config, demo users, HTTP page source.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let page_source = HttpPageSource::new(config.scraper.request_timeout())?;
        let credentials = InMemoryCredentialStore::with_demo_users()?;
        Ok(Self::new(
            config,
            Arc::new(credentials),
            Arc::new(page_source),
        ))
    }

    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        page_source: Arc<dyn PageSource>,
    ) -> Self {
        let source = CatalogSource::File(config.data_path.clone());
        let catalog = Arc::new(RwLock::new(BookStore::open(source.clone())));
        let auth = AuthService::new(credentials, &config.jwt_secret, config.jwt_expiration_hours);
        let scrape_runner = ScrapeRunner {
            source: page_source,
            settings: config.scraper.crawl_settings(),
            output_path: config.data_path.clone(),
            catalog: Arc::clone(&catalog),
            timeout: config.scraper.run_timeout(),
        };

        Self {
            catalog,
            pipeline: Arc::new(Mutex::new(MlPipeline::new(source))),
            auth: Arc::new(auth),
            scrape_job: Arc::new(ScrapeJob::new()),
            scrape_runner,
            config: Arc::new(config),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error reason (e.g. `token_expired`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(error: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code.to_string()),
        }
    }
}

pub fn json_422(err: impl Display, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::failure(
            format!("Invalid JSON body: {} (expected: {})", err, expected),
            "invalid_body",
        )),
    )
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Case-insensitive category substring.
    pub category: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PriceRangeQuery {
    /// Inclusive lower bound.
    pub min: Option<f64>,
    /// Inclusive upper bound.
    pub max: Option<f64>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopRatedQuery {
    /// Number of books to return (default 20).
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrainingDataQuery {
    /// Target column (default `rating`).
    pub target: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, ToSchema)]
pub struct TrainRequest {
    /// Target column (default `rating`).
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct PredictionRequest {
    pub data: Vec<FeatureInput>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
    pub total: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ReloadResponse {
    pub records_loaded: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub total_books_loaded: usize,
    pub version: String,
}
