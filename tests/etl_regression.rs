use chrono::NaiveDate;
use macro_data::calendar::month_end;
use macro_data::forecast::{chronological_split, run_forecasts, shift_features, ForecastModel, PREDICTION_COLUMN};
use macro_data::loader::{load_all, load_table, LoadMode, LoadOutcome};
use macro_data::store::{SqliteStore, TableStore};
use macro_data::{ForecastError, SeriesTable};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn month_ends(year: i32, months: std::ops::RangeInclusive<u32>) -> Vec<NaiveDate> {
    months.map(|m| month_end(d(year, m, 1))).collect()
}

fn table(columns: &[&str], rows: Vec<(NaiveDate, Vec<Option<f64>>)>) -> SeriesTable {
    SeriesTable::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
}

#[test]
fn test_incremental_load_is_idempotent() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    let gold = SeriesTable::from_raw(
        "Gold Price",
        vec![
            (d(2024, 1, 7), Some(2_030.0)),
            (d(2024, 1, 14), Some(2_045.5)),
            (d(2024, 1, 21), None),
        ],
    );
    let tables = vec![("gold".to_string(), gold.clone())];

    let first = load_all(&mut store, &tables, LoadMode::Incremental).unwrap();
    assert_eq!(first[0].1, LoadOutcome::Appended { rows: 3 });
    let snapshot = store.load_table("gold").unwrap();
    assert_eq!(snapshot, gold);

    let second = load_all(&mut store, &tables, LoadMode::Incremental).unwrap();
    assert_eq!(second[0].1, LoadOutcome::UpToDate);
    assert_eq!(store.load_table("gold").unwrap(), snapshot);
}

#[test]
fn test_incremental_load_appends_only_after_stored_max() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    let history = SeriesTable::from_raw("r*", vec![(d(2024, 3, 31), Some(0.70)), (d(2024, 6, 30), Some(0.74))]);
    load_table(&mut store, "rstar", &history, LoadMode::Full).unwrap();

    // revised history is ignored, only the new quarter lands
    let refreshed = SeriesTable::from_raw(
        "r*",
        vec![
            (d(2024, 3, 31), Some(0.71)),
            (d(2024, 6, 30), Some(0.75)),
            (d(2024, 9, 30), Some(0.76)),
        ],
    );
    let outcome = load_table(&mut store, "rstar", &refreshed, LoadMode::Incremental).unwrap();
    assert_eq!(outcome, LoadOutcome::Appended { rows: 1 });

    let stored = store.load_table("rstar").unwrap();
    assert_eq!(stored.column("r*").unwrap(), &[Some(0.70), Some(0.74), Some(0.76)]);
}

#[test]
fn test_lag_shifts_observation_to_later_month_end() {
    let inputs = SeriesTable::from_raw("Future New Orders", vec![(d(2023, 8, 31), Some(12.0))]);
    let shifted = shift_features(&inputs, 6);
    assert_eq!(shifted.index(), &[d(2024, 2, 29)]);
    assert_eq!(shifted.column("Future New Orders").unwrap(), &[Some(12.0)]);
}

#[test]
fn test_split_is_chronological_eighty_twenty() {
    let (train, test) = chronological_split(100);
    assert_eq!(train, 80);
    assert_eq!(test, 20);
}

/// Stores the four source tables the feature builder reads, covering
/// Jan to Apr 2024. USD averages 10, 12 and 11 over Jan to Mar.
fn seed_sources(store: &mut SqliteStore) {
    let months = month_ends(2024, 1..=4);

    let monthly = table(
        &["Future New Orders (Philadelphia)", "Future Business Activity (Texas)", "US M2"],
        months.iter().map(|m| (*m, vec![Some(20.0), Some(5.0), Some(21_000.0)])).collect(),
    );
    let quarterly = table(
        &["Private Residential Fixed Investment", "Real Gross Private Domestic Investment"],
        vec![
            (d(2023, 3, 31), vec![Some(100.0), Some(1000.0)]),
            (d(2023, 6, 30), vec![Some(105.0), Some(1000.0)]),
            (d(2023, 9, 30), vec![Some(110.0), Some(1000.0)]),
            (d(2023, 12, 31), vec![Some(115.0), Some(1000.0)]),
        ],
    );
    let conditions = table(
        &["USD", "WTI Crude"],
        vec![
            (d(2024, 1, 2), vec![Some(9.0), Some(72.0)]),
            (d(2024, 1, 3), vec![Some(11.0), Some(73.0)]),
            (d(2024, 2, 1), vec![Some(12.0), Some(75.0)]),
            (d(2024, 3, 1), vec![Some(11.0), Some(80.0)]),
        ],
    );
    let ism = table(
        &["ISM", "ISM New Orders", "ISM Inventories"],
        months
            .iter()
            .zip([50.0, 52.0, 55.0, 53.0])
            .map(|(m, v)| (*m, vec![Some(v), Some(51.0), Some(49.0)]))
            .collect(),
    );

    store.replace_table("monthly_data", &monthly).unwrap();
    store.replace_table("quarterly_data", &quarterly).unwrap();
    store.replace_table("financial_conditions", &conditions).unwrap();
    store.replace_table("ism", &ism).unwrap();
}

const USD_MODEL: ForecastModel = ForecastModel {
    table: "model_usd",
    lag: 1,
    start: (2023, 12, 31),
    features: &["USD"],
};

const SMOOTHED_ORDERS_MODEL: ForecastModel = ForecastModel {
    table: "model_orders",
    lag: 6,
    start: (2023, 12, 31),
    features: &["Future New Orders"],
};

#[test]
fn test_forecast_end_to_end_through_store() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    seed_sources(&mut store);

    let reports = run_forecasts(&mut store, &[USD_MODEL]).unwrap();
    let run = reports[0].outcome.as_ref().unwrap();

    // features Jan..Mar lagged to Feb..Apr meet targets 52, 55, 53
    assert_eq!(run.train_rows + run.test_rows, 3);
    assert_eq!(run.test_rows, 1);

    let stored = store.load_table("model_usd").unwrap();
    assert_eq!(stored.column_names(), vec![PREDICTION_COLUMN]);
    assert_eq!(stored.index(), &[d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30)]);
    let predicted = stored.column(PREDICTION_COLUMN).unwrap();
    assert!((predicted[0].unwrap() - 52.0).abs() < 1e-9);
    assert!((predicted[1].unwrap() - 55.0).abs() < 1e-9);
    assert!((predicted[2].unwrap() - 53.5).abs() < 1e-9);
}

#[test]
fn test_failing_model_does_not_block_the_next() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    seed_sources(&mut store);

    // four months of data never fill a six-month window
    let reports = run_forecasts(&mut store, &[SMOOTHED_ORDERS_MODEL, USD_MODEL]).unwrap();
    assert!(matches!(
        reports[0].outcome,
        Err(ForecastError::InsufficientData { .. })
    ));
    assert!(reports[1].outcome.is_ok());
    assert!(!store.table_exists("model_orders").unwrap());
    assert!(store.table_exists("model_usd").unwrap());
}

#[test]
fn test_prediction_tables_are_replaced_on_rerun() {
    let mut store = SqliteStore::new_in_memory().unwrap();
    seed_sources(&mut store);

    run_forecasts(&mut store, &[USD_MODEL]).unwrap();
    run_forecasts(&mut store, &[USD_MODEL]).unwrap();
    assert_eq!(store.load_table("model_usd").unwrap().len(), 3);
}
