//! Flat-file persistence for the book catalog.

pub mod csv_file;

pub use csv_file::{inspect_books, read_books, write_books, DataFileInfo, PriceRange};
