//! The catalog record.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Column names of the catalog file, in file order.
pub const BOOK_COLUMNS: &[&str] = &[
    "id",
    "title",
    "price",
    "rating",
    "availability",
    "category",
    "image_url",
    "book_url",
];

/// One cataloged book. Built once from a row of the catalog file and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub price: f64,
    /// Star rating, 0 (unknown) to 5.
    pub rating: u8,
    pub availability: String,
    pub category: String,
    pub image_url: String,
    pub book_url: String,
}

impl Book {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        title: &str,
        price: f64,
        rating: u8,
        availability: &str,
        category: &str,
        image_url: &str,
        book_url: &str,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            price,
            rating,
            availability: availability.to_string(),
            category: category.to_string(),
            image_url: image_url.to_string(),
            book_url: book_url.to_string(),
        }
    }
}

/// Records served when the catalog file is missing or unreadable.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new(
            1,
            "Sample Book 1",
            19.99,
            4,
            "In stock",
            "Fiction",
            "https://example.com/img1.jpg",
            "https://example.com/book1",
        ),
        Book::new(
            2,
            "Sample Book 2",
            25.50,
            5,
            "In stock",
            "Science",
            "https://example.com/img2.jpg",
            "https://example.com/book2",
        ),
        Book::new(
            3,
            "Sample Book 3",
            15.75,
            3,
            "Out of stock",
            "History",
            "https://example.com/img3.jpg",
            "https://example.com/book3",
        ),
    ]
}
