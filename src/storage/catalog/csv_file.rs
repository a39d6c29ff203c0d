//! CSV reader/writer for the catalog file.
//!
//! The file carries a header row `id,title,price,rating,availability,category,image_url,book_url`
//! and one book per row, in the order the books were scraped.

use crate::domain::catalog::{Book, CatalogError, BOOK_COLUMNS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use utoipa::ToSchema;

fn unavailable(path: &Path, reason: impl ToString) -> CatalogError {
    CatalogError::DataUnavailable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Reads every row of the catalog file, preserving file order.
///
/// Fails with `DataUnavailable` when the file is missing, has no header naming every catalog
/// column, a row does not parse, or a rating falls outside 0..=5.
pub fn read_books(path: &Path) -> Result<Vec<Book>, CatalogError> {
    if !path.exists() {
        return Err(unavailable(path, "file not found"));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| unavailable(path, e))?;
    let headers = reader.headers().map_err(|e| unavailable(path, e))?;
    let missing: Vec<&str> = BOOK_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h.trim() == *column))
        .collect();
    if !missing.is_empty() {
        return Err(unavailable(
            path,
            format!("header is missing column(s): {}", missing.join(", ")),
        ));
    }

    let mut books = Vec::new();
    for (idx, row) in reader.deserialize::<Book>().enumerate() {
        let book = row.map_err(|e| unavailable(path, format!("row {}: {}", idx + 1, e)))?;
        if book.rating > 5 {
            return Err(unavailable(
                path,
                format!("row {}: rating {} out of range", idx + 1, book.rating),
            ));
        }
        if !book.price.is_finite() || book.price < 0.0 {
            return Err(unavailable(
                path,
                format!("row {}: invalid price {}", idx + 1, book.price),
            ));
        }
        books.push(book);
    }
    Ok(books)
}

/// Writes `books` to `path`, creating parent directories as needed.
///
/// Rows go to a temporary file in the target directory that is then renamed over `path`, so
/// readers see either the previous file or the complete new one. The header is written even
/// for an empty set.
pub fn write_books(path: &Path, books: &[Book]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let staged = NamedTempFile::new_in(dir)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(staged.as_file());
    writer.write_record(BOOK_COLUMNS)?;
    for book in books {
        writer.serialize(book)?;
    }
    writer.flush()?;
    drop(writer);

    staged.as_file().sync_all()?;
    staged.persist(path)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Summary of the catalog file on disk, independent of what is loaded in memory.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataFileInfo {
    pub path: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
    pub total_books: usize,
    pub columns: Vec<String>,
    pub categories: usize,
    pub price_range: Option<PriceRange>,
}

pub fn inspect_books(path: &Path) -> Result<DataFileInfo, CatalogError> {
    let meta = fs::metadata(path).map_err(|e| unavailable(path, e))?;
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);

    let mut reader = csv::Reader::from_path(path).map_err(|e| unavailable(path, e))?;
    let columns = reader
        .headers()
        .map_err(|e| unavailable(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    let books = read_books(path)?;

    let categories = books
        .iter()
        .map(|b| b.category.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let price_range = if books.is_empty() {
        None
    } else {
        let prices = books.iter().map(|b| b.price);
        Some(PriceRange {
            min: prices.clone().fold(f64::INFINITY, f64::min),
            max: prices.clone().fold(f64::NEG_INFINITY, f64::max),
            avg: prices.sum::<f64>() / books.len() as f64,
        })
    };

    Ok(DataFileInfo {
        path: path.display().to_string(),
        size_bytes: meta.len(),
        modified,
        total_books: books.len(),
        columns,
        categories,
        price_range,
    })
}
