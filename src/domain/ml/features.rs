//! The fixed feature recipe and its fitted transformers.
//!
//! Training and inference both go through [`build_features`], so a record produces the same
//! vector either way given the same fitted encoders. Two details are intentionally batch
//! relative or fallback based:
//! - `is_expensive` compares a price with the 75th percentile of the prices in the *same batch*.
//! - category/availability values the encoders never saw encode as 0.

use crate::domain::catalog::Book;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FEATURE_NAMES: [&str; 9] = [
    "price",
    "rating",
    "title_length",
    "title_word_count",
    "price_per_rating",
    "is_expensive",
    "is_high_rated",
    "category_encoded",
    "availability_encoded",
];

pub const EXPENSIVE_QUANTILE: f64 = 0.75;
pub const HIGH_RATING: f64 = 4.0;

/// Raw fields the recipe reads. Any of them may be absent in a prediction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

impl From<&Book> for FeatureInput {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            price: Some(book.price),
            rating: Some(f64::from(book.rating)),
            category: Some(book.category.clone()),
            availability: Some(book.availability.clone()),
        }
    }
}

/// Maps text labels to the index of the label in the sorted set seen at fit time.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Unseen labels encode as the fallback code 0.
    pub fn encode(&self, value: &str) -> f64 {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_or(0.0, |idx| idx as f64)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// The category and availability encoders, fitted together.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedEncoders {
    pub category: LabelEncoder,
    pub availability: LabelEncoder,
}

impl FittedEncoders {
    /// Missing labels fit as the empty string so they get a stable code of their own.
    pub fn fit(inputs: &[FeatureInput]) -> Self {
        Self {
            category: LabelEncoder::fit(inputs.iter().map(|i| i.category.as_deref().unwrap_or(""))),
            availability: LabelEncoder::fit(
                inputs.iter().map(|i| i.availability.as_deref().unwrap_or("")),
            ),
        }
    }

    pub fn names(&self) -> Vec<String> {
        vec!["category".to_string(), "availability".to_string()]
    }
}

/// Percentile with linear interpolation between the two closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Applies the feature recipe to a batch. Rows follow [`FEATURE_NAMES`]; missing numbers are 0.
pub fn build_features(inputs: &[FeatureInput], encoders: &FittedEncoders) -> Vec<Vec<f64>> {
    let batch_prices: Vec<f64> = inputs.iter().filter_map(|i| i.price).collect();
    let expensive_threshold = percentile(&batch_prices, EXPENSIVE_QUANTILE);

    inputs
        .iter()
        .map(|input| {
            let title = input.title.as_deref().unwrap_or("");
            let price_per_rating = match (input.price, input.rating) {
                (Some(p), Some(r)) => p / (r + 1.0),
                _ => 0.0,
            };
            let is_expensive = match (input.price, expensive_threshold) {
                (Some(p), Some(t)) if p > t => 1.0,
                _ => 0.0,
            };
            let is_high_rated = match input.rating {
                Some(r) if r >= HIGH_RATING => 1.0,
                _ => 0.0,
            };

            let row = [
                input.price.unwrap_or(0.0),
                input.rating.unwrap_or(0.0),
                title.chars().count() as f64,
                title.split_whitespace().count() as f64,
                price_per_rating,
                is_expensive,
                is_high_rated,
                encoders
                    .category
                    .encode(input.category.as_deref().unwrap_or("")),
                encoders
                    .availability
                    .encode(input.availability.as_deref().unwrap_or("")),
            ];
            row.into_iter()
                .map(|v| if v.is_finite() { v } else { 0.0 })
                .collect()
        })
        .collect()
}

/// Zero-mean, unit-variance normalizer. Zero-variance columns keep a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2) / n;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| if v > 0.0 { v.sqrt() } else { 1.0 })
            .collect();
        Self { mean, scale }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::sample_books;

    fn sample_inputs() -> Vec<FeatureInput> {
        sample_books().iter().map(FeatureInput::from).collect()
    }

    #[test]
    fn recipe_produces_expected_columns() {
        let inputs = sample_inputs();
        let encoders = FittedEncoders::fit(&inputs);
        let rows = build_features(&inputs, &encoders);

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == FEATURE_NAMES.len()));

        // "Sample Book 2", 25.50, rating 5, Science, In stock
        let second = &rows[1];
        assert_eq!(second[0], 25.50);
        assert_eq!(second[1], 5.0);
        assert_eq!(second[2], 13.0);
        assert_eq!(second[3], 3.0);
        assert_eq!(second[4], 25.50 / 6.0);
        assert_eq!(second[5], 1.0);
        assert_eq!(second[6], 1.0);
        // sorted categories: Fiction, History, Science
        assert_eq!(second[7], 2.0);
        // sorted availability: In stock, Out of stock
        assert_eq!(second[8], 0.0);

        // rating 3 -> not high rated; 15.75 is below the batch 75th percentile
        assert_eq!(rows[2][5], 0.0);
        assert_eq!(rows[2][6], 0.0);
        assert_eq!(rows[2][8], 1.0);
    }

    #[test]
    fn rating_zero_does_not_divide_by_zero() {
        let input = FeatureInput {
            title: Some("Unrated".into()),
            price: Some(12.0),
            rating: Some(0.0),
            ..Default::default()
        };
        let encoders = FittedEncoders::fit(&[input.clone()]);
        let rows = build_features(&[input], &encoders);
        assert_eq!(rows[0][4], 12.0);
    }

    #[test]
    fn missing_numbers_fill_with_zero() {
        let input = FeatureInput::default();
        let encoders = FittedEncoders::fit(&sample_inputs());
        let rows = build_features(&[input], &encoders);
        assert_eq!(rows[0], vec![0.0; FEATURE_NAMES.len()]);
    }

    #[test]
    fn expensive_flag_is_relative_to_the_batch() {
        let cheap = |price| FeatureInput {
            price: Some(price),
            ..Default::default()
        };
        let encoders = FittedEncoders::fit(&[]);

        let batch = [cheap(1.0), cheap(2.0), cheap(3.0), cheap(4.0), cheap(100.0)];
        let flags: Vec<f64> = build_features(&batch, &encoders)
            .iter()
            .map(|r| r[5])
            .collect();
        assert_eq!(flags, vec![0.0, 0.0, 0.0, 0.0, 1.0]);

        // A lone record is never above its own percentile.
        let single = build_features(&[cheap(100.0)], &encoders);
        assert_eq!(single[0][5], 0.0);
    }

    #[test]
    fn unseen_labels_use_fallback_code() {
        let encoders = FittedEncoders::fit(&sample_inputs());
        assert_eq!(encoders.category.encode("Poetry"), 0.0);
        assert_eq!(encoders.category.encode("History"), 1.0);
        assert_eq!(encoders.availability.encode("Preorder"), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.75), Some(3.25));
        let p = percentile(&[19.99, 25.50, 15.75], 0.75).unwrap();
        assert!((p - 22.745).abs() < 1e-9);
        assert_eq!(percentile(&[], 0.75), None);
    }

    #[test]
    fn scaler_centers_and_reuses_fitted_statistics() {
        let train = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&train);
        assert_eq!(scaler.transform(&train), vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
        // A different batch is transformed with the training statistics, not its own.
        assert_eq!(scaler.transform(&[vec![5.0, 7.0]]), vec![vec![3.0, 2.0]]);
    }
}
