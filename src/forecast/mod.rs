//! ISM forecasting: feature assembly, OLS fitting and prediction tables.

pub mod features;
pub mod model;
pub mod regression;

pub use features::{build_inputs, FeatureSources};
pub use model::{
    chronological_split, fit_model, join_with_target, run_forecasts, shift_features, ForecastModel, ModelReport,
    ModelRun, MODELS, PREDICTION_COLUMN,
};
pub use regression::{r2_score, LinearRegression};
