//! The two ISM nowcasting models: lagged features, chronological split,
//! OLS fit and the stored prediction tables.

use super::features::{
    build_inputs, FeatureSources, FUTURE_BUSINESS_ACTIVITY, FUTURE_NEW_ORDERS, ISM, ORDERS_MINUS_INVENTORIES,
    RESIDENTIAL_SHARE,
};
use super::regression::{r2_score, LinearRegression};
use crate::calendar::shift_month_ends;
use crate::error::ForecastError;
use crate::series::SeriesTable;
use crate::store::TableStore;
use chrono::NaiveDate;
use ndarray::{s, Array1, Array2};
use tracing::{error, info};

/// Column of every prediction table
pub const PREDICTION_COLUMN: &str = "ISM Predicted";

/// Share of the joined rows held out for evaluation
const TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastModel {
    /// Table the predictions are written to
    pub table: &'static str,
    /// Month-ends between a feature observation and the ISM print it predicts
    pub lag: i32,
    /// Only dates strictly after this are used
    pub start: (i32, u32, u32),
    pub features: &'static [&'static str],
}

impl ForecastModel {
    pub fn start_date(&self) -> Result<NaiveDate, ForecastError> {
        let (y, m, d) = self.start;
        NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| ForecastError::InvalidStart(self.table.to_string()))
    }
}

pub const MODEL_1: ForecastModel = ForecastModel {
    table: "model_1",
    lag: 6,
    start: (2000, 1, 1),
    features: &[FUTURE_NEW_ORDERS, RESIDENTIAL_SHARE],
};

pub const MODEL_2: ForecastModel = ForecastModel {
    table: "model_2",
    lag: 4,
    start: (2005, 3, 1),
    features: &[ORDERS_MINUS_INVENTORIES, FUTURE_BUSINESS_ACTIVITY],
};

pub const MODELS: [ForecastModel; 2] = [MODEL_1, MODEL_2];

/// A fitted model with its held-out score and full-history predictions.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub regression: LinearRegression,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the test targets have no variance
    pub r2: Option<f64>,
    pub predictions: SeriesTable,
}

/// Moves every feature date forward by `lag` month-ends, so the value stored
/// at D is the observation made at D - lag.
pub fn shift_features(inputs: &SeriesTable, lag: i32) -> SeriesTable {
    inputs.map_index(|date| shift_month_ends(date, lag))
}

/// Rows where every feature and the target are present.
pub fn join_with_target(features: &SeriesTable, target: &SeriesTable, start: NaiveDate) -> Result<SeriesTable, ForecastError> {
    let target = target.select(&[ISM])?.after(start);
    Ok(features.inner_join(&target).drop_incomplete())
}

/// Splits `rows` into `(train, test)` counts, the test set being the most
/// recent `ceil(0.2 * rows)` rows.
pub fn chronological_split(rows: usize) -> (usize, usize) {
    let test = (rows as f64 * TEST_FRACTION).ceil() as usize;
    (rows - test, test)
}

fn design_matrix(table: &SeriesTable, columns: &[&str]) -> Result<Array2<f64>, ForecastError> {
    let values = columns
        .iter()
        .map(|name| table.require(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Array2::from_shape_fn((table.len(), columns.len()), |(row, col)| {
        values[col][row].unwrap_or(f64::NAN)
    }))
}

/// Fits one model on the shared input table and predicts every date where
/// all of its features are present.
pub fn fit_model(model: &ForecastModel, inputs: &SeriesTable, ism: &SeriesTable) -> Result<ModelRun, ForecastError> {
    let start = model.start_date()?;
    let features = shift_features(inputs, model.lag).after(start).select(model.features)?;

    let joined = join_with_target(&features, ism, start)?;
    let (train_rows, test_rows) = chronological_split(joined.len());
    let required = model.features.len() + 1;
    if train_rows < required {
        return Err(ForecastError::InsufficientData {
            model: model.table.to_string(),
            rows: joined.len(),
            required,
        });
    }

    let x = design_matrix(&joined, model.features)?;
    let y: Array1<f64> = design_matrix(&joined, &[ISM])?.column(0).to_owned();

    let regression = LinearRegression::fit(&x.slice(s![..train_rows, ..]).to_owned(), &y.slice(s![..train_rows]).to_owned())?;
    let held_out = regression.predict(&x.slice(s![train_rows.., ..]).to_owned())?;
    let r2 = r2_score(&y.slice(s![train_rows..]).to_owned(), &held_out);

    let complete = features.drop_incomplete();
    let predicted = regression.predict(&design_matrix(&complete, model.features)?)?;
    let predictions = SeriesTable::from_raw(
        PREDICTION_COLUMN,
        complete.index().iter().copied().zip(predicted.iter().map(|v| Some(*v))).collect(),
    );

    Ok(ModelRun {
        regression,
        train_rows,
        test_rows,
        r2,
        predictions,
    })
}

/// Result of one model in a forecast run.
#[derive(Debug)]
pub struct ModelReport {
    pub table: &'static str,
    pub outcome: Result<ModelRun, ForecastError>,
}

/// Builds the inputs from the store, fits each model and replaces its
/// prediction table.
///
/// A model that cannot be fitted is logged and skipped; the others still
/// run. Missing source tables and storage errors abort.
pub fn run_forecasts<S: TableStore + ?Sized>(
    store: &mut S,
    models: &[ForecastModel],
) -> Result<Vec<ModelReport>, ForecastError> {
    let sources = FeatureSources::load(store)?;
    let inputs = build_inputs(&sources)?;

    let mut reports = Vec::with_capacity(models.len());
    for model in models {
        let outcome = fit_model(model, &inputs, &sources.ism);
        match &outcome {
            Ok(run) => {
                match run.r2 {
                    Some(r2) => info!("{}: out-of-sample R² {:.4} ({} train / {} test rows)", model.table, r2, run.train_rows, run.test_rows),
                    None => info!("{}: out-of-sample R² undefined ({} test rows)", model.table, run.test_rows),
                }
                store.replace_table(model.table, &run.predictions)?;
                info!("Table '{}' created with {} predictions.", model.table, run.predictions.len());
            }
            Err(e) => error!("Skipping {}: {}", model.table, e),
        }
        reports.push(ModelReport {
            table: model.table,
            outcome,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::month_end;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const ONE_FEATURE: ForecastModel = ForecastModel {
        table: "model_test",
        lag: 1,
        start: (2023, 12, 31),
        features: &["Feature"],
    };

    #[test]
    fn test_split_holds_out_ceiling_of_a_fifth() {
        assert_eq!(chronological_split(100), (80, 20));
        assert_eq!(chronological_split(101), (80, 21));
        assert_eq!(chronological_split(3), (2, 1));
        assert_eq!(chronological_split(0), (0, 0));
    }

    #[test]
    fn test_lag_moves_feature_to_later_month_end() {
        let inputs = SeriesTable::from_raw("Feature", vec![(d(2024, 1, 31), Some(10.0))]);
        assert_eq!(shift_features(&inputs, 6).index(), &[d(2024, 7, 31)]);
        assert_eq!(shift_features(&inputs, 4).index(), &[d(2024, 5, 31)]);
    }

    #[test]
    fn test_model_constants() {
        assert_eq!(MODEL_1.start_date().unwrap(), d(2000, 1, 1));
        assert_eq!(MODEL_2.lag, 4);
        assert_eq!(MODEL_2.features, &[ORDERS_MINUS_INVENTORIES, FUTURE_BUSINESS_ACTIVITY]);
    }

    #[test]
    fn test_fits_lagged_feature_against_target() {
        let target = SeriesTable::from_raw(
            ISM,
            (1..=4).map(|m| month_end(d(2024, m, 1))).zip([50.0, 52.0, 55.0, 53.0]).map(|(d, v)| (d, Some(v))).collect(),
        );
        let inputs = SeriesTable::from_raw(
            "Feature",
            (1..=3).map(|m| month_end(d(2024, m, 1))).zip([10.0, 12.0, 11.0]).map(|(d, v)| (d, Some(v))).collect(),
        );

        let run = fit_model(&ONE_FEATURE, &inputs, &target).unwrap();
        assert_eq!((run.train_rows, run.test_rows), (2, 1));
        // trained on (10, 52) and (12, 55)
        assert!((run.regression.coefficients[0] - 1.5).abs() < 1e-9);
        assert!((run.regression.intercept - 37.0).abs() < 1e-9);
        assert_eq!(run.r2, None);

        assert_eq!(run.predictions.index(), &[d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30)]);
        let predicted = run.predictions.column(PREDICTION_COLUMN).unwrap();
        assert!((predicted[2].unwrap() - 53.5).abs() < 1e-9);
    }

    #[test]
    fn test_too_little_history_is_reported() {
        let target = SeriesTable::from_raw(ISM, vec![(d(2024, 2, 29), Some(50.0))]);
        let inputs = SeriesTable::from_raw("Feature", vec![(d(2024, 1, 31), Some(10.0))]);
        assert!(matches!(
            fit_model(&ONE_FEATURE, &inputs, &target),
            Err(ForecastError::InsufficientData { rows: 1, required: 2, .. })
        ));
    }
}
