pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::ml_pipeline::MlPipeline;
pub use app::scrape_job::{ScrapeJob, ScrapeRunner};
pub use domain::auth::{AuthService, InMemoryCredentialStore, Permission};
pub use domain::catalog::{Book, BookStore, CatalogSource};
pub use infra::config::Config;
