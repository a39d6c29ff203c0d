//! Summary statistics over a slice of books.

use super::Book;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

/// Collection-wide summary. All fields are zero for an empty collection.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsOverview {
    pub total_books: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Rating value -> number of books with that rating.
    #[schema(value_type = Object)]
    pub rating_distribution: BTreeMap<u8, usize>,
    pub total_categories: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryStats {
    pub total_books: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub average_rating: f64,
}

struct PriceSummary {
    mean: f64,
    min: f64,
    max: f64,
}

fn summarize_prices<'a>(books: impl IntoIterator<Item = &'a Book>) -> Option<PriceSummary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for book in books {
        count += 1;
        sum += book.price;
        min = min.min(book.price);
        max = max.max(book.price);
    }
    (count > 0).then(|| PriceSummary {
        mean: sum / count as f64,
        min,
        max,
    })
}

impl StatsOverview {
    pub fn from_books(books: &[Book]) -> Self {
        let Some(prices) = summarize_prices(books) else {
            return Self {
                total_books: 0,
                average_price: 0.0,
                min_price: 0.0,
                max_price: 0.0,
                rating_distribution: BTreeMap::new(),
                total_categories: 0,
            };
        };

        let mut rating_distribution = BTreeMap::new();
        for book in books {
            *rating_distribution.entry(book.rating).or_insert(0) += 1;
        }
        let total_categories = books
            .iter()
            .map(|b| b.category.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            total_books: books.len(),
            average_price: prices.mean,
            min_price: prices.min,
            max_price: prices.max,
            rating_distribution,
            total_categories,
        }
    }
}

/// Per-category aggregates, keyed (and therefore ordered) by category name.
pub fn category_stats(books: &[Book]) -> BTreeMap<String, CategoryStats> {
    let mut grouped: BTreeMap<&str, Vec<&Book>> = BTreeMap::new();
    for book in books {
        grouped.entry(book.category.as_str()).or_default().push(book);
    }

    grouped
        .into_iter()
        .filter_map(|(category, members)| {
            let prices = summarize_prices(members.iter().copied())?;
            let rating_sum: f64 = members.iter().map(|b| f64::from(b.rating)).sum();
            Some((
                category.to_string(),
                CategoryStats {
                    total_books: members.len(),
                    average_price: prices.mean,
                    min_price: prices.min,
                    max_price: prices.max,
                    average_rating: rating_sum / members.len() as f64,
                },
            ))
        })
        .collect()
}
