//! The in-memory book catalog: records, the read-only store, and its statistics.

pub mod book;
pub mod stats;
pub mod store;

pub use book::{sample_books, Book, BOOK_COLUMNS};
pub use stats::{CategoryStats, StatsOverview};
pub use store::{BookStore, CatalogSource};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file is missing or could not be parsed.
    #[error("catalog data unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },
}
