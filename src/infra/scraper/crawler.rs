//! Paginated crawl as a lazy stream of page outcomes.
//!
//! Termination is decided by [`CrawlState`] alone, so it can be exercised without I/O.

use super::parser::{ListingParser, ScrapedBook};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the body of `url`, or an error for transport failures and non-success statuses.
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: String,
    pub max_pages: usize,
    pub max_consecutive_failures: usize,
    /// Pause before every page after the first.
    pub page_delay: Duration,
}

/// Page 1 is the site index; later pages live under `catalogue/`.
pub fn page_url(base_url: &str, page: usize) -> String {
    let base = base_url.trim_end_matches('/');
    if page <= 1 {
        format!("{base}/index.html")
    } else {
        format!("{base}/catalogue/page-{page}.html")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Fetched {
        page: usize,
        url: String,
        books: Vec<ScrapedBook>,
        has_next: bool,
    },
    Failed {
        page: usize,
        url: String,
        reason: String,
    },
}

impl PageOutcome {
    /// A page only counts as a success when it yielded at least one book.
    pub fn is_success(&self) -> bool {
        matches!(self, PageOutcome::Fetched { books, .. } if !books.is_empty())
    }

    pub fn page(&self) -> usize {
        match self {
            PageOutcome::Fetched { page, .. } | PageOutcome::Failed { page, .. } => *page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageLimit,
    LastPage,
    FailureStreak,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::PageLimit => "page_limit",
            StopReason::LastPage => "last_page",
            StopReason::FailureStreak => "failure_streak",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct CrawlState {
    next_page: usize,
    failure_streak: usize,
    max_pages: usize,
    max_failures: usize,
    stopped: Option<StopReason>,
}

impl CrawlState {
    pub fn new(max_pages: usize, max_failures: usize) -> Self {
        Self {
            next_page: 1,
            failure_streak: 0,
            max_pages,
            max_failures: max_failures.max(1),
            stopped: if max_pages == 0 {
                Some(StopReason::PageLimit)
            } else {
                None
            },
        }
    }

    /// The page to fetch next, or `None` once the crawl has stopped.
    pub fn next_page(&self) -> Option<usize> {
        match self.stopped {
            Some(_) => None,
            None => Some(self.next_page),
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    pub fn failure_streak(&self) -> usize {
        self.failure_streak
    }

    /// Folds one page outcome into the state and returns the stop reason if it ended the crawl.
    pub fn record(&mut self, outcome: &PageOutcome) -> Option<StopReason> {
        if self.stopped.is_some() {
            return self.stopped;
        }

        if outcome.is_success() {
            self.failure_streak = 0;
            if let PageOutcome::Fetched { has_next: false, .. } = outcome {
                self.stopped = Some(StopReason::LastPage);
            }
        } else {
            self.failure_streak += 1;
            if self.failure_streak >= self.max_failures {
                self.stopped = Some(StopReason::FailureStreak);
            }
        }

        self.next_page += 1;
        if self.stopped.is_none() && self.next_page > self.max_pages {
            self.stopped = Some(StopReason::PageLimit);
        }
        self.stopped
    }
}

async fn fetch_page<S>(source: &S, parser: &ListingParser, url: String, page: usize) -> PageOutcome
where
    S: PageSource + ?Sized,
{
    let parsed_url = match Url::parse(&url) {
        Ok(u) => u,
        Err(e) => {
            return PageOutcome::Failed {
                page,
                url,
                reason: e.to_string(),
            }
        }
    };
    match source.fetch(&url).await {
        Ok(html) => {
            let listing = parser.parse(&html, &parsed_url, page);
            PageOutcome::Fetched {
                page,
                url,
                has_next: listing.next_page.is_some(),
                books: listing.books,
            }
        }
        Err(e) => PageOutcome::Failed {
            page,
            url,
            reason: e.to_string(),
        },
    }
}

/// Lazily fetches listing pages until [`CrawlState`] says stop.
pub fn crawl<'a, S>(
    source: &'a S,
    parser: &'a ListingParser,
    settings: &'a CrawlSettings,
) -> impl Stream<Item = PageOutcome> + Send + 'a
where
    S: PageSource + ?Sized,
{
    let state = CrawlState::new(settings.max_pages, settings.max_consecutive_failures);
    stream::unfold(state, move |mut state| async move {
        let page = state.next_page()?;
        if page > 1 && !settings.page_delay.is_zero() {
            tokio::time::sleep(settings.page_delay).await;
        }
        let outcome = fetch_page(source, parser, page_url(&settings.base_url, page), page).await;
        state.record(&outcome);
        Some((outcome, state))
    })
}

#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub books: Vec<ScrapedBook>,
    pub pages_visited: usize,
    pub stop_reason: Option<StopReason>,
}

/// Drives [`crawl`] to completion and collects every book in page order.
pub async fn run_crawl<S>(source: &S, settings: &CrawlSettings) -> anyhow::Result<CrawlSummary>
where
    S: PageSource + ?Sized,
{
    let parser = ListingParser::new()?;
    let mut summary = CrawlSummary::default();
    let mut state = CrawlState::new(settings.max_pages, settings.max_consecutive_failures);

    let pages = crawl(source, &parser, settings);
    futures::pin_mut!(pages);
    while let Some(outcome) = pages.next().await {
        summary.pages_visited += 1;
        match &outcome {
            PageOutcome::Fetched { page, books, .. } if !books.is_empty() => {
                info!("Page {}: {} books", page, books.len());
            }
            PageOutcome::Fetched { page, url, .. } => {
                warn!("Page {} ({}) had no books", page, url);
            }
            PageOutcome::Failed { page, url, reason } => {
                warn!("Page {} ({}) failed: {}", page, url, reason);
            }
        }
        // Mirrors the stream's own state so the stop reason can be reported.
        state.record(&outcome);
        if let PageOutcome::Fetched { books, .. } = outcome {
            summary.books.extend(books);
        }
    }

    summary.stop_reason = state.stop_reason();
    info!(
        "Crawl finished after {} page(s): {} books ({:?})",
        summary.pages_visited,
        summary.books.len(),
        summary.stop_reason
    );
    Ok(summary)
}
