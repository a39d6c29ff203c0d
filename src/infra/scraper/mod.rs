//! Catalog scraper: listing-page parser, page sources and the paginated crawl.

mod crawler;
mod http;
mod parser;

pub use crawler::{
    crawl, page_url, run_crawl, CrawlSettings, CrawlState, CrawlSummary, PageOutcome, PageSource,
    StopReason,
};
pub use http::HttpPageSource;
pub use parser::{category_for_page, into_books, ListingPage, ListingParser, ScrapedBook};
