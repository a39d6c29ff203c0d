//! Single-slot background scrape job.
//!
//! At most one run is active at a time: the slot is claimed with a compare-and-swap and
//! released by [`ScrapeSlot`]'s `Drop`, including when the run panics or times out.

use crate::domain::catalog::{BookStore, CatalogSource};
use crate::infra::scraper::{into_books, run_crawl, CrawlSettings, PageSource};
use crate::storage::catalog::write_books;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use utoipa::ToSchema;

/// Runs kept in the in-memory history.
const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("a scrape is already running")]
    AlreadyRunning,

    #[error("scrape timed out after {0:?}")]
    Timeout(Duration),

    #[error("scrape failed: {0}")]
    Failed(String),
}

impl ScrapeError {
    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::AlreadyRunning => "scrape_in_progress",
            ScrapeError::Timeout(_) => "scrape_timeout",
            ScrapeError::Failed(_) => "scrape_failed",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ScrapeStatus {
    pub is_running: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// `"success"` or the error message of the last finished run.
    pub last_result: Option<String>,
    pub total_books_scraped: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScrapeRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub result: String,
    pub books_scraped: usize,
    pub pages_visited: usize,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub books_scraped: usize,
    pub pages_visited: usize,
    pub stop_reason: Option<String>,
}

/// Everything a run needs: where to fetch from, where to write, and which store to refresh.
#[derive(Clone)]
pub struct ScrapeRunner {
    pub source: Arc<dyn PageSource>,
    pub settings: CrawlSettings,
    pub output_path: PathBuf,
    pub catalog: Arc<RwLock<BookStore>>,
    pub timeout: Duration,
}

impl ScrapeRunner {
    /// Crawls, writes the catalog file, then reloads the store from it.
    ///
    /// An empty crawl leaves both the file and the store untouched.
    pub async fn run(&self) -> Result<ScrapeOutcome, ScrapeError> {
        let summary = run_crawl(self.source.as_ref(), &self.settings)
            .await
            .map_err(|e| ScrapeError::Failed(e.to_string()))?;

        let outcome = ScrapeOutcome {
            books_scraped: summary.books.len(),
            pages_visited: summary.pages_visited,
            stop_reason: summary.stop_reason.map(|r| r.to_string()),
        };
        if summary.books.is_empty() {
            warn!("Scrape collected no books; keeping the current catalog");
            return Ok(outcome);
        }

        let books = into_books(summary.books);
        write_books(&self.output_path, &books).map_err(|e| ScrapeError::Failed(e.to_string()))?;
        let loaded = self
            .catalog
            .write()
            .await
            .load(CatalogSource::File(self.output_path.clone()))
            .map_err(|e| ScrapeError::Failed(e.to_string()))?;
        info!(
            "Wrote {} books to {} and reloaded the catalog ({} records)",
            books.len(),
            self.output_path.display(),
            loaded
        );
        Ok(outcome)
    }

    /// [`run`](Self::run) bounded by the configured timeout.
    pub async fn run_with_timeout(&self) -> Result<ScrapeOutcome, ScrapeError> {
        match tokio::time::timeout(self.timeout, self.run()).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout(self.timeout)),
        }
    }
}

#[derive(Default)]
pub struct ScrapeJob {
    running: AtomicBool,
    status: RwLock<ScrapeStatus>,
    history: RwLock<Vec<ScrapeRun>>,
}

/// Proof of holding the job slot. Dropping it frees the slot.
pub struct ScrapeSlot {
    job: Arc<ScrapeJob>,
}

impl Drop for ScrapeSlot {
    fn drop(&mut self) {
        self.job.running.store(false, Ordering::Release);
    }
}

impl ScrapeJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn try_claim(self: &Arc<Self>) -> Result<ScrapeSlot, ScrapeError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScrapeError::AlreadyRunning)?;
        Ok(ScrapeSlot {
            job: Arc::clone(self),
        })
    }

    pub async fn status(&self) -> ScrapeStatus {
        let mut status = self.status.read().await.clone();
        status.is_running = self.is_running();
        status
    }

    /// Finished runs, oldest first.
    pub async fn history(&self) -> Vec<ScrapeRun> {
        self.history.read().await.clone()
    }

    /// Claims the slot and starts `runner` in the background.
    ///
    /// Returns the start time, or [`ScrapeError::AlreadyRunning`] without side effects.
    pub async fn spawn(self: &Arc<Self>, runner: ScrapeRunner) -> Result<DateTime<Utc>, ScrapeError> {
        let slot = self.try_claim()?;
        let started_at = Utc::now();
        self.status.write().await.last_run = Some(started_at);

        let job = Arc::clone(self);
        tokio::spawn(async move {
            let _slot = slot;
            info!("Scrape started");
            let result = runner.run_with_timeout().await;
            job.finish(started_at, result).await;
        });
        Ok(started_at)
    }

    async fn finish(&self, started_at: DateTime<Utc>, result: Result<ScrapeOutcome, ScrapeError>) {
        let run = match result {
            Ok(outcome) => {
                info!("Scrape finished: {} books", outcome.books_scraped);
                ScrapeRun {
                    started_at,
                    finished_at: Utc::now(),
                    success: true,
                    result: "success".to_string(),
                    books_scraped: outcome.books_scraped,
                    pages_visited: outcome.pages_visited,
                    stop_reason: outcome.stop_reason,
                }
            }
            Err(e) => {
                error!("Scrape failed: {}", e);
                ScrapeRun {
                    started_at,
                    finished_at: Utc::now(),
                    success: false,
                    result: e.to_string(),
                    books_scraped: 0,
                    pages_visited: 0,
                    stop_reason: None,
                }
            }
        };

        {
            let mut status = self.status.write().await;
            status.last_result = Some(run.result.clone());
            if run.success {
                status.total_books_scraped = run.books_scraped;
            }
        }

        let mut history = self.history.write().await;
        history.push(run);
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
    }
}
