//! Centralized configuration (environment variables + defaults).

use anyhow::anyhow;
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::{info, warn};

use crate::infra::scraper::CrawlSettings;

pub const DEFAULT_JWT_SECRET: &str = "books-api-development-secret";
pub const DEFAULT_SCRAPER_BASE_URL: &str = "https://books.toscrape.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Catalog CSV read at startup and written by the scrape job.
    pub data_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub max_pages: usize,
    /// Hard limit on one background scrape run.
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
    pub max_consecutive_failures: usize,
    pub request_timeout_secs: u64,
}

impl ScraperConfig {
    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            base_url: self.base_url.clone(),
            max_pages: self.max_pages,
            max_consecutive_failures: self.max_consecutive_failures,
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCRAPER_BASE_URL.to_string(),
            max_pages: 50,
            timeout_secs: 600,
            page_delay_ms: 1000,
            max_consecutive_failures: 3,
            request_timeout_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5005,
            data_path: PathBuf::from("data/books_data.csv"),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            scraper: ScraperConfig::default(),
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and the process environment. Unset keys take their defaults;
    /// present but unparsable keys are an error.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, using the built-in development secret");
                defaults.jwt_secret
            }
        };

        let scraper = ScraperConfig {
            base_url: try_load("SCRAPER_BASE_URL", defaults.scraper.base_url)?,
            max_pages: try_load("SCRAPER_MAX_PAGES", defaults.scraper.max_pages)?.max(1),
            timeout_secs: try_load("SCRAPER_TIMEOUT_SECS", defaults.scraper.timeout_secs)?,
            page_delay_ms: try_load("SCRAPER_PAGE_DELAY_MS", defaults.scraper.page_delay_ms)?,
            max_consecutive_failures: try_load(
                "SCRAPER_MAX_CONSECUTIVE_FAILURES",
                defaults.scraper.max_consecutive_failures,
            )?
            .max(1),
            request_timeout_secs: try_load(
                "SCRAPER_REQUEST_TIMEOUT_SECS",
                defaults.scraper.request_timeout_secs,
            )?,
        };

        Ok(Self {
            host: try_load("API_HOST", defaults.host)?,
            port: try_load("PORT", defaults.port)?,
            data_path: try_load("BOOKS_DATA_PATH", defaults.data_path)?,
            jwt_secret,
            jwt_expiration_hours: try_load("JWT_EXPIRATION_HOURS", defaults.jwt_expiration_hours)?,
            scraper,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        Err(_) => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}
