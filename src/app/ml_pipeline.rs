//! The ML pipeline: load -> prepare features -> train -> predict, with an explicit reset.
//!
//! Fitted artifacts (encoders, scaler, forest) are committed together only after a training
//! run succeeds, so a failed retrain leaves the previous model usable.

use crate::domain::catalog::{Book, CatalogSource, BOOK_COLUMNS};
use crate::domain::ml::{
    build_features, mean_squared_error, r2_score, train_test_split, FeatureInput, FittedEncoders,
    ForestParams, RandomForestRegressor, StandardScaler, Summary, FEATURE_NAMES,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

pub const DEFAULT_TARGET: &str = "rating";
pub const MODEL_TYPE: &str = "RandomForestRegressor";
const TEST_FRACTION: f64 = 0.2;
const SPLIT_SEED: u64 = 42;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data available")]
    NoData,

    #[error("target column '{0}' not found")]
    UnknownColumn(String),

    #[error("target column '{0}' is not numeric")]
    NonNumericTarget(String),

    #[error("not enough records to train ({samples} available)")]
    InsufficientData { samples: usize },

    #[error("model not trained; run POST /api/v1/ml/train first")]
    ModelNotTrained,
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NoData => "no_data",
            PipelineError::UnknownColumn(_) => "unknown_column",
            PipelineError::NonNumericTarget(_) => "non_numeric_target",
            PipelineError::InsufficientData { .. } => "insufficient_data",
            PipelineError::ModelNotTrained => "model_not_trained",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Uninitialized,
    Loaded,
    Trained,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreparedFeatures {
    /// One row per record, columns ordered as `feature_names`.
    pub features: Vec<Vec<f64>>,
    pub feature_names: Vec<String>,
    /// `[rows, columns]`
    #[schema(value_type = Vec<usize>)]
    pub shape: [usize; 2],
    #[schema(value_type = Object)]
    pub statistics: BTreeMap<String, Summary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingData {
    #[serde(rename = "X_train")]
    pub x_train: Vec<Vec<f64>>,
    #[serde(rename = "X_test")]
    pub x_test: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub train_size: usize,
    pub test_size: usize,
    pub target_statistics: Summary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingMetrics {
    pub train_mse: f64,
    pub test_mse: f64,
    pub train_r2: f64,
    pub test_r2: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrainingReport {
    pub model_trained: bool,
    pub target_column: String,
    pub metrics: TrainingMetrics,
    #[schema(value_type = Object)]
    pub feature_importance: BTreeMap<String, f64>,
    pub model_type: String,
    pub training_samples: usize,
    pub test_samples: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Prediction {
    pub prediction: f64,
    /// `1 / (1 + std)` of the per-tree predictions.
    pub confidence: f64,
    pub input_data: FeatureInput,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PredictionBatch {
    pub predictions: Vec<Prediction>,
    pub model_type: String,
    pub total_predictions: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelInfo {
    pub state: PipelineState,
    pub model_trained: bool,
    pub model_type: Option<String>,
    pub data_available: bool,
    pub total_samples: usize,
    pub features_available: Vec<String>,
    pub label_encoders: Vec<String>,
    pub target_column: Option<String>,
    pub trained_at: Option<DateTime<Utc>>,
}

struct FittedModel {
    encoders: FittedEncoders,
    scaler: StandardScaler,
    forest: RandomForestRegressor,
    feature_names: Vec<String>,
    target_column: String,
    trained_at: DateTime<Utc>,
}

/// Training partitions plus the artifacts fitted while producing them.
struct TrainingSet {
    data: TrainingData,
    encoders: FittedEncoders,
    scaler: StandardScaler,
}

pub struct MlPipeline {
    source: CatalogSource,
    forest_params: ForestParams,
    records: Option<Arc<Vec<Book>>>,
    model: Option<FittedModel>,
}

fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn target_value(book: &Book, column: &str) -> Result<f64, PipelineError> {
    match column {
        "id" => Ok(book.id as f64),
        "price" => Ok(book.price),
        "rating" => Ok(f64::from(book.rating)),
        other if BOOK_COLUMNS.contains(&other) => {
            Err(PipelineError::NonNumericTarget(other.to_string()))
        }
        other => Err(PipelineError::UnknownColumn(other.to_string())),
    }
}

fn select_rows(rows: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    indices.iter().map(|&i| rows[i].clone()).collect()
}

impl MlPipeline {
    pub fn new(source: CatalogSource) -> Self {
        Self::with_forest_params(source, ForestParams::default())
    }

    pub fn with_forest_params(source: CatalogSource, forest_params: ForestParams) -> Self {
        Self {
            source,
            forest_params,
            records: None,
            model: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        match (&self.records, &self.model) {
            (None, _) => PipelineState::Uninitialized,
            (Some(_), None) => PipelineState::Loaded,
            (Some(_), Some(_)) => PipelineState::Trained,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Discards records and every fitted artifact. The next access reloads the source.
    pub fn reset(&mut self) {
        self.records = None;
        self.model = None;
        info!("ML pipeline reset");
    }

    fn records(&mut self) -> Arc<Vec<Book>> {
        if let Some(records) = &self.records {
            return Arc::clone(records);
        }
        let records = Arc::new(self.source.read_or_sample());
        info!("ML pipeline loaded {} records", records.len());
        self.records = Some(Arc::clone(&records));
        records
    }

    fn feature_matrix(&mut self) -> Result<(Vec<Vec<f64>>, FittedEncoders), PipelineError> {
        let records = self.records();
        if records.is_empty() {
            return Err(PipelineError::NoData);
        }
        let inputs: Vec<FeatureInput> = records.iter().map(FeatureInput::from).collect();
        let encoders = match &self.model {
            Some(model) => model.encoders.clone(),
            None => FittedEncoders::fit(&inputs),
        };
        Ok((build_features(&inputs, &encoders), encoders))
    }

    /// The unscaled feature table of the current records, with per-feature statistics.
    pub fn prepare_features(&mut self) -> Result<PreparedFeatures, PipelineError> {
        let (rows, _) = self.feature_matrix()?;
        let statistics = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
                (name.to_string(), Summary::of(&column))
            })
            .collect();

        Ok(PreparedFeatures {
            shape: [rows.len(), FEATURE_NAMES.len()],
            features: rows,
            feature_names: feature_names(),
            statistics,
        })
    }

    fn training_set(&mut self, target_column: &str) -> Result<TrainingSet, PipelineError> {
        let (rows, encoders) = self.feature_matrix()?;
        let records = self.records();
        let targets = records
            .iter()
            .map(|b| target_value(b, target_column))
            .collect::<Result<Vec<f64>, _>>()?;

        let (train_idx, test_idx) = train_test_split(rows.len(), TEST_FRACTION, SPLIT_SEED);
        if train_idx.is_empty() {
            return Err(PipelineError::InsufficientData {
                samples: rows.len(),
            });
        }

        let x_train_raw = select_rows(&rows, &train_idx);
        let scaler = StandardScaler::fit(&x_train_raw);
        let x_train = scaler.transform(&x_train_raw);
        let x_test = scaler.transform(&select_rows(&rows, &test_idx));

        let data = TrainingData {
            y_train: train_idx.iter().map(|&i| targets[i]).collect(),
            y_test: test_idx.iter().map(|&i| targets[i]).collect(),
            train_size: x_train.len(),
            test_size: x_test.len(),
            x_train,
            x_test,
            feature_names: feature_names(),
            target_column: target_column.to_string(),
            target_statistics: Summary::of(&targets),
        };
        Ok(TrainingSet {
            data,
            encoders,
            scaler,
        })
    }

    /// 80/20 split of the scaled feature table against `target_column`.
    pub fn prepare_training_data(&mut self, target_column: &str) -> Result<TrainingData, PipelineError> {
        self.training_set(target_column).map(|set| set.data)
    }

    /// Fits a new forest. On error the previously held model, if any, is kept.
    pub fn train(&mut self, target_column: &str) -> Result<TrainingReport, PipelineError> {
        let TrainingSet {
            data,
            encoders,
            scaler,
        } = self.training_set(target_column)?;

        let forest = RandomForestRegressor::fit(&data.x_train, &data.y_train, self.forest_params);
        let train_pred = forest.predict(&data.x_train);
        let test_pred = forest.predict(&data.x_test);

        let metrics = TrainingMetrics {
            train_mse: mean_squared_error(&data.y_train, &train_pred),
            test_mse: mean_squared_error(&data.y_test, &test_pred),
            train_r2: r2_score(&data.y_train, &train_pred),
            test_r2: r2_score(&data.y_test, &test_pred),
        };
        let feature_importance = data
            .feature_names
            .iter()
            .cloned()
            .zip(forest.feature_importances())
            .collect();

        info!(
            "Trained {} on '{}' ({} train / {} test rows, test r2 {:.4})",
            MODEL_TYPE, target_column, data.train_size, data.test_size, metrics.test_r2
        );

        self.model = Some(FittedModel {
            encoders,
            scaler,
            forest,
            feature_names: data.feature_names.clone(),
            target_column: target_column.to_string(),
            trained_at: Utc::now(),
        });

        Ok(TrainingReport {
            model_trained: true,
            target_column: target_column.to_string(),
            metrics,
            feature_importance,
            model_type: MODEL_TYPE.to_string(),
            training_samples: data.train_size,
            test_samples: data.test_size,
        })
    }

    /// Predicts with the held model, reusing the encoders and scaler fitted at training time.
    pub fn predict(&self, inputs: &[FeatureInput]) -> Result<PredictionBatch, PipelineError> {
        let model = self.model.as_ref().ok_or(PipelineError::ModelNotTrained)?;

        let rows = model.scaler.transform(&build_features(inputs, &model.encoders));
        let predictions: Vec<Prediction> = model
            .forest
            .predict_with_spread(&rows)
            .into_iter()
            .zip(inputs)
            .map(|((prediction, spread), input)| Prediction {
                prediction,
                confidence: 1.0 / (1.0 + spread),
                input_data: input.clone(),
            })
            .collect();

        Ok(PredictionBatch {
            total_predictions: predictions.len(),
            predictions,
            model_type: MODEL_TYPE.to_string(),
        })
    }

    pub fn model_info(&mut self) -> ModelInfo {
        let records = self.records();
        let model = self.model.as_ref();
        ModelInfo {
            state: self.state(),
            model_trained: model.is_some(),
            model_type: model.map(|_| MODEL_TYPE.to_string()),
            data_available: !records.is_empty(),
            total_samples: records.len(),
            features_available: if records.is_empty() {
                Vec::new()
            } else {
                BOOK_COLUMNS.iter().map(|c| c.to_string()).collect()
            },
            label_encoders: model.map(|m| m.encoders.names()).unwrap_or_default(),
            target_column: model.map(|m| m.target_column.clone()),
            trained_at: model.map(|m| m.trained_at),
        }
    }

    /// Names of the features the held model was trained on.
    pub fn model_features(&self) -> Option<&[String]> {
        self.model.as_ref().map(|m| m.feature_names.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::sample_books;

    fn catalog() -> Vec<Book> {
        let categories = ["Fiction", "Science", "History", "Poetry"];
        (0..40)
            .map(|i| {
                let rating = (i % 5 + 1) as u8;
                Book::new(
                    i + 1,
                    &format!("Book number {}", i + 1),
                    10.0 + f64::from(rating) * 5.0 + (i % 3) as f64,
                    rating,
                    if i % 4 == 0 { "Out of stock" } else { "In stock" },
                    categories[(i % 4) as usize],
                    "",
                    "",
                )
            })
            .collect()
    }

    fn pipeline() -> MlPipeline {
        MlPipeline::with_forest_params(
            CatalogSource::Static(catalog()),
            ForestParams { n_trees: 20, seed: 42 },
        )
    }

    #[test]
    fn loads_lazily_and_trains() {
        let mut p = pipeline();
        assert_eq!(p.state(), PipelineState::Uninitialized);

        p.prepare_features().unwrap();
        assert_eq!(p.state(), PipelineState::Loaded);

        let report = p.train("rating").unwrap();
        assert!(report.model_trained);
        assert_eq!(report.training_samples, 32);
        assert_eq!(report.test_samples, 8);
        assert_eq!(report.feature_importance.len(), FEATURE_NAMES.len());
        assert_eq!(p.state(), PipelineState::Trained);
        assert_eq!(p.model_features().unwrap().len(), FEATURE_NAMES.len());
    }

    #[test]
    fn prepare_features_is_deterministic() {
        let mut p = pipeline();
        let a = p.prepare_features().unwrap();
        let b = p.prepare_features().unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.shape, [40, FEATURE_NAMES.len()]);
        assert_eq!(a.statistics.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn empty_source_has_no_data() {
        let mut p = MlPipeline::new(CatalogSource::Static(Vec::new()));
        assert!(matches!(p.prepare_features(), Err(PipelineError::NoData)));
        assert!(matches!(p.train("rating"), Err(PipelineError::NoData)));
    }

    #[test]
    fn target_column_is_validated() {
        let mut p = pipeline();
        assert!(matches!(
            p.prepare_training_data("popularity"),
            Err(PipelineError::UnknownColumn(_))
        ));
        assert!(matches!(
            p.prepare_training_data("title"),
            Err(PipelineError::NonNumericTarget(_))
        ));

        let data = p.prepare_training_data("price").unwrap();
        assert_eq!(data.train_size + data.test_size, 40);
        assert_eq!(data.y_train.len(), data.train_size);
        assert!(data.x_train.iter().all(|r| r.len() == FEATURE_NAMES.len()));
    }

    #[test]
    fn training_scaler_centers_train_partition() {
        let mut p = pipeline();
        let data = p.prepare_training_data("rating").unwrap();
        for col in 0..FEATURE_NAMES.len() {
            let mean: f64 =
                data.x_train.iter().map(|r| r[col]).sum::<f64>() / data.x_train.len() as f64;
            assert!(mean.abs() < 1e-9, "column {} mean {}", col, mean);
        }
    }

    #[test]
    fn predict_requires_training_and_fails_after_reset() {
        let mut p = pipeline();
        let input = FeatureInput::from(&catalog()[0]);
        assert!(matches!(
            p.predict(&[input.clone()]),
            Err(PipelineError::ModelNotTrained)
        ));

        p.train("rating").unwrap();
        assert_eq!(p.predict(&[input.clone()]).unwrap().total_predictions, 1);

        p.reset();
        assert_eq!(p.state(), PipelineState::Uninitialized);
        assert!(matches!(p.predict(&[input]), Err(PipelineError::ModelNotTrained)));
    }

    #[test]
    fn unseen_category_still_predicts() {
        let mut p = pipeline();
        p.train("rating").unwrap();
        let input = FeatureInput {
            title: Some("Something New".into()),
            price: Some(30.0),
            rating: Some(4.0),
            category: Some("Cookbooks".into()),
            availability: Some("Preorder".into()),
        };
        let batch = p.predict(&[input.clone()]).unwrap();
        let prediction = &batch.predictions[0];
        assert!(prediction.prediction.is_finite());
        assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);
        assert_eq!(prediction.input_data, input);
    }

    #[test]
    fn failed_retrain_keeps_previous_model() {
        let mut p = pipeline();
        p.train("rating").unwrap();
        assert!(p.train("title").is_err());
        assert!(p.is_trained());
        let info = p.model_info();
        assert_eq!(info.target_column.as_deref(), Some("rating"));
        assert_eq!(info.label_encoders, vec!["category", "availability"]);
    }

    #[test]
    fn single_record_cannot_be_split_for_training() {
        let mut p = MlPipeline::new(CatalogSource::Static(vec![sample_books().remove(0)]));
        assert!(matches!(
            p.train("rating"),
            Err(PipelineError::InsufficientData { samples: 1 })
        ));
    }

    #[test]
    fn model_info_reports_lazy_load() {
        let mut p = MlPipeline::new(CatalogSource::Static(sample_books()));
        let info = p.model_info();
        assert_eq!(info.state, PipelineState::Loaded);
        assert!(!info.model_trained);
        assert_eq!(info.total_samples, 3);
        assert_eq!(info.features_available.len(), 8);
        assert!(info.model_type.is_none());
    }
}
