//! Read-only book store with a whole-sequence reload.

use super::stats::{category_stats, CategoryStats, StatsOverview};
use super::{sample_books, Book, CatalogError};
use crate::storage::catalog::read_books;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Where the store reads its records from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// A CSV file in the catalog layout.
    File(PathBuf),
    /// A fixed, in-process record set.
    Static(Vec<Book>),
}

impl CatalogSource {
    pub fn read(&self) -> Result<Vec<Book>, CatalogError> {
        match self {
            CatalogSource::File(path) => read_books(path),
            CatalogSource::Static(books) => Ok(books.clone()),
        }
    }

    /// Reads the source, falling back to the built-in sample set when it is unavailable.
    pub fn read_or_sample(&self) -> Vec<Book> {
        match self.read() {
            Ok(books) => books,
            Err(e) => {
                warn!("{}; serving built-in sample data", e);
                sample_books()
            }
        }
    }
}

/// Ordered, in-memory book collection.
///
/// Records are only ever replaced wholesale; callers get clones or shared snapshots.
pub struct BookStore {
    source: CatalogSource,
    books: Arc<Vec<Book>>,
}

impl BookStore {
    /// Opens `source`, serving the sample set if it cannot be read.
    pub fn open(source: CatalogSource) -> Self {
        let books = source.read_or_sample();
        info!("Book store opened with {} records", books.len());
        Self {
            source,
            books: Arc::new(books),
        }
    }

    /// Loads `source` and adopts it as the store's source. On failure the prior contents stay.
    pub fn load(&mut self, source: CatalogSource) -> Result<usize, CatalogError> {
        let books = source.read()?;
        let count = books.len();
        self.books = Arc::new(books);
        self.source = source;
        Ok(count)
    }

    /// Re-reads the current source.
    pub fn reload(&mut self) -> Result<usize, CatalogError> {
        self.load(self.source.clone())
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All records in source order.
    pub fn get_all(&self) -> &[Book] {
        &self.books
    }

    /// A shared handle on the current record sequence; unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<Vec<Book>> {
        Arc::clone(&self.books)
    }

    pub fn get_by_id(&self, id: i64) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Case-insensitive substring search; both filters must match when both are given.
    pub fn search(&self, title: Option<&str>, category: Option<&str>) -> Vec<Book> {
        let title = title.map(str::to_lowercase);
        let category = category.map(str::to_lowercase);
        self.books
            .iter()
            .filter(|b| {
                title
                    .as_deref()
                    .map_or(true, |t| b.title.to_lowercase().contains(t))
            })
            .filter(|b| {
                category
                    .as_deref()
                    .map_or(true, |c| b.category.to_lowercase().contains(c))
            })
            .cloned()
            .collect()
    }

    /// Books with `min <= price <= max`; a missing bound is unbounded.
    pub fn filter_by_price(&self, min: Option<f64>, max: Option<f64>) -> Vec<Book> {
        self.books
            .iter()
            .filter(|b| min.map_or(true, |m| b.price >= m))
            .filter(|b| max.map_or(true, |m| b.price <= m))
            .cloned()
            .collect()
    }

    /// Highest rated first; equal ratings keep source order.
    pub fn top_rated(&self, limit: usize) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.as_ref().clone();
        books.sort_by(|a, b| b.rating.cmp(&a.rating));
        books.truncate(limit);
        books
    }

    /// Distinct categories, sorted.
    pub fn distinct_categories(&self) -> Vec<String> {
        self.books
            .iter()
            .map(|b| b.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn stats_overview(&self) -> StatsOverview {
        StatsOverview::from_books(&self.books)
    }

    pub fn stats_by_category(&self) -> BTreeMap<String, CategoryStats> {
        category_stats(&self.books)
    }
}
