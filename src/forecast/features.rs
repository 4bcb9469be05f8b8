//! Assembles the monthly feature table and the ISM target from stored tables.

use crate::calendar::{shift_month_ends, Frequency};
use crate::error::{ForecastError, SeriesError};
use crate::normalize::{difference, ratio, resample, rolling_mean, upsample_cubic, Aggregation};
use crate::series::SeriesTable;
use crate::store::TableStore;

pub const FUTURE_NEW_ORDERS: &str = "Future New Orders";
pub const FUTURE_BUSINESS_ACTIVITY: &str = "Future Business Activity";
pub const RESIDENTIAL_SHARE: &str = "Residential % Domestic";
pub const USD: &str = "USD";
pub const WTI: &str = "WTI";
pub const ORDERS_MINUS_INVENTORIES: &str = "Orders - Inventories";

/// Target column of the `ism` table
pub const ISM: &str = "ISM";

/// Month-ends by which the residential share trails its reference quarter
const RESIDENTIAL_PUBLICATION_LAG: i32 = 3;

/// The stored tables the features are computed from.
#[derive(Debug, Clone, Default)]
pub struct FeatureSources {
    pub monthly: SeriesTable,
    pub quarterly: SeriesTable,
    pub financial_conditions: SeriesTable,
    pub ism: SeriesTable,
}

impl FeatureSources {
    pub fn load<S: TableStore + ?Sized>(store: &S) -> Result<Self, ForecastError> {
        Ok(FeatureSources {
            monthly: store.load_table("monthly_data")?,
            quarterly: store.load_table("quarterly_data")?,
            financial_conditions: store.load_table("financial_conditions")?,
            ism: store.load_table("ism")?,
        })
    }
}

/// `window`-period trailing mean of `source` as a single-column table named `target`.
fn smoothed(
    table: &SeriesTable,
    source: &str,
    target: &str,
    window: usize,
    drop_missing: bool,
) -> Result<SeriesTable, SeriesError> {
    let mut base = table.select(&[source])?;
    if drop_missing {
        base = base.drop_incomplete();
    }
    let values = rolling_mean(base.require(source)?, window);
    Ok(SeriesTable::from_raw(target, base.index().iter().copied().zip(values).collect()))
}

fn monthly_mean(table: &SeriesTable, source: &str, target: &str) -> Result<SeriesTable, SeriesError> {
    let mut monthly = resample(&table.select(&[source])?, Frequency::Monthly, Aggregation::Mean);
    if source != target {
        monthly.rename_column(source, target)?;
    }
    Ok(monthly)
}

/// Residential fixed investment as a share of real domestic investment,
/// cubic-interpolated to month-end and moved forward by its publication lag.
fn residential_share(quarterly: &SeriesTable) -> Result<SeriesTable, SeriesError> {
    let share = ratio(
        quarterly.require("Private Residential Fixed Investment")?,
        quarterly.require("Real Gross Private Domestic Investment")?,
    );
    let share = SeriesTable::from_raw(RESIDENTIAL_SHARE, quarterly.index().iter().copied().zip(share).collect());
    Ok(upsample_cubic(&share, Frequency::Monthly).map_index(|d| shift_month_ends(d, RESIDENTIAL_PUBLICATION_LAG)))
}

fn orders_minus_inventories(ism: &SeriesTable) -> Result<SeriesTable, SeriesError> {
    let spread = difference(ism.require("ISM New Orders")?, ism.require("ISM Inventories")?);
    let spread = SeriesTable::from_raw(ORDERS_MINUS_INVENTORIES, ism.index().iter().copied().zip(spread).collect());
    smoothed(&spread, ORDERS_MINUS_INVENTORIES, ORDERS_MINUS_INVENTORIES, 3, true)
}

/// Builds every candidate feature. The first feature's dates form the index;
/// the rest are aligned onto it.
pub fn build_inputs(sources: &FeatureSources) -> Result<SeriesTable, SeriesError> {
    let features = [
        smoothed(&sources.monthly, "Future New Orders (Philadelphia)", FUTURE_NEW_ORDERS, 6, false)?,
        smoothed(&sources.monthly, "Future Business Activity (Texas)", FUTURE_BUSINESS_ACTIVITY, 6, true)?,
        residential_share(&sources.quarterly)?,
        monthly_mean(&sources.financial_conditions, "USD", USD)?,
        monthly_mean(&sources.financial_conditions, "WTI Crude", WTI)?,
        orders_minus_inventories(&sources.ism)?,
    ];

    let mut inputs = SeriesTable::new();
    for feature in &features {
        for name in feature.column_names() {
            inputs.assign(name, feature, name)?;
        }
    }
    Ok(inputs)
}
