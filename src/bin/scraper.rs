// src/bin/scraper.rs
//
// One-shot crawl that writes the catalog file without starting the API.

use books_catalog_api::infra::scraper::{into_books, run_crawl, HttpPageSource};
use books_catalog_api::infra::telemetry;
use books_catalog_api::storage::catalog::write_books;
use books_catalog_api::Config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env()?;
    let source = HttpPageSource::new(config.scraper.request_timeout())?;
    let settings = config.scraper.crawl_settings();
    info!(
        "Crawling {} (up to {} pages)",
        settings.base_url, settings.max_pages
    );

    let summary = tokio::time::timeout(config.scraper.run_timeout(), run_crawl(&source, &settings))
        .await
        .map_err(|_| anyhow::anyhow!("crawl timed out after {:?}", config.scraper.run_timeout()))??;

    if summary.books.is_empty() {
        warn!("No books collected; {} left untouched", config.data_path.display());
        return Ok(());
    }

    let books = into_books(summary.books);
    write_books(&config.data_path, &books)?;
    info!("Saved {} books to {}", books.len(), config.data_path.display());
    Ok(())
}
