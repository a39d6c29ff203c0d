//! Feature engineering and the regression ensemble behind the ML endpoints.

pub mod features;
pub mod forest;
pub mod metrics;
pub mod split;

pub use features::{
    build_features, FeatureInput, FittedEncoders, LabelEncoder, StandardScaler, FEATURE_NAMES,
};
pub use forest::{ForestParams, RandomForestRegressor};
pub use metrics::{mean_squared_error, r2_score, Summary};
pub use split::train_test_split;
