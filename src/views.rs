//! Liquidity and credit indicator views computed from stored tables.
//!
//! Views are read-only derivations: they are rebuilt from the store on
//! demand and exported as CSV, never written back to the database.

use crate::calendar::Frequency;
use crate::error::{SeriesError, StoreError};
use crate::normalize::{
    add_credit_impulse, add_difference, add_yoy, credit_change_pct_gdp, resample, Aggregation, CreditImpulseSpec,
};
use crate::series::SeriesTable;
use crate::store::TableStore;
use chrono::NaiveDate;
use thiserror::Error;

const GDP: &str = "GDP";
const MORTGAGE_UNIT_DIVISOR: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid start date {start:?} for view '{view}'")]
    InvalidStart {
        view: &'static str,
        start: (i32, u32, u32),
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    PrivateCreditImpulse,
    MortgageCreditImpulse,
    ExcessLiquidity,
    TotalLiquidity,
}

impl View {
    pub const ALL: [View; 4] = [
        View::PrivateCreditImpulse,
        View::MortgageCreditImpulse,
        View::ExcessLiquidity,
        View::TotalLiquidity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            View::PrivateCreditImpulse => "private_credit_impulse",
            View::MortgageCreditImpulse => "mortgage_credit_impulse",
            View::ExcessLiquidity => "excess_liquidity",
            View::TotalLiquidity => "total_liquidity",
        }
    }
}

/// First excluded date of the mortgage view
const MORTGAGE_START: (i32, u32, u32) = (1988, 1, 1);
/// First excluded date of the total liquidity view
const TOTAL_LIQUIDITY_START: (i32, u32, u32) = (2011, 1, 1);

fn start_date(view: View, (y, m, d): (i32, u32, u32)) -> Result<NaiveDate, ViewError> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or(ViewError::InvalidStart {
        view: view.name(),
        start: (y, m, d),
    })
}

/// `stock` next to quarterly GDP, as the base of a credit view.
fn with_gdp(quarterly: &SeriesTable, stock: &str) -> Result<SeriesTable, SeriesError> {
    let mut table = quarterly.select(&[stock])?;
    table.assign(GDP, quarterly, "US GDP")?;
    Ok(table)
}

/// Total private credit: four-quarter change and credit impulse, both as a
/// percent of GDP. Only rows where everything is defined are kept.
pub fn private_credit_impulse(quarterly: &SeriesTable) -> Result<SeriesTable, SeriesError> {
    let mut table = with_gdp(quarterly, "Total Private Credit")?;
    let change = credit_change_pct_gdp(table.require("Total Private Credit")?, table.require(GDP)?);
    table.set_column("Credit Change % GDP", change)?;
    add_credit_impulse(&mut table, "Total Private Credit", GDP, &CreditImpulseSpec::PRIVATE_CREDIT)?;
    Ok(table.drop_incomplete())
}

/// Mortgage credit impulse, stock converted to billions, from 1988.
pub fn mortgage_credit_impulse(quarterly: &SeriesTable) -> Result<SeriesTable, ViewError> {
    let mut table = with_gdp(quarterly, "Total Mortgage Debt")?;
    table.map_column("Total Mortgage Debt", |v| v / MORTGAGE_UNIT_DIVISOR)?;
    add_credit_impulse(&mut table, "Total Mortgage Debt", GDP, &CreditImpulseSpec::MORTGAGE_CREDIT)?;
    Ok(table.after(start_date(View::MortgageCreditImpulse, MORTGAGE_START)?))
}

/// M2 growth in excess of nominal GDP growth, year over year, quarterly.
pub fn excess_liquidity(monthly: &SeriesTable, quarterly: &SeriesTable) -> Result<SeriesTable, SeriesError> {
    let mut m2 = resample(&monthly.select(&["US M2"])?, Frequency::Quarterly, Aggregation::Last);
    add_yoy(&mut m2, "US M2", "M2 YoY%", Frequency::Quarterly)?;

    let mut table = quarterly.select(&["US GDP"])?;
    add_yoy(&mut table, "US GDP", "GDP YoY%", Frequency::Quarterly)?;
    table.assign("M2 YoY%", &m2, "M2 YoY%")?;
    add_difference(&mut table, "M2 YoY%", "GDP YoY%", "Excess Liquidity")?;
    Ok(table)
}

/// US M2 plus Fed net liquidity, monthly from 2011, with its YoY change.
pub fn total_liquidity(fed_liquidity: &SeriesTable, monthly: &SeriesTable) -> Result<SeriesTable, ViewError> {
    let mut table = resample(
        &fed_liquidity.select(&["Fed Net Liquidity"])?,
        Frequency::Monthly,
        Aggregation::Mean,
    )
    .after(start_date(View::TotalLiquidity, TOTAL_LIQUIDITY_START)?);
    table.assign("M2", monthly, "US M2")?;
    let mut table = table.drop_incomplete();

    let total = table
        .require("M2")?
        .iter()
        .zip(table.require("Fed Net Liquidity")?)
        .map(|(m2, fed)| Some((*m2)? + (*fed)?))
        .collect();
    table.set_column("Total Liquidity", total)?;
    add_yoy(&mut table, "Total Liquidity", "Liquidity YoY%", Frequency::Monthly)?;
    Ok(table.drop_incomplete())
}

/// Builds every view from the store, in [`View::ALL`] order.
pub fn build_views<S: TableStore + ?Sized>(store: &S) -> Result<Vec<(String, SeriesTable)>, ViewError> {
    let monthly = store.load_table("monthly_data")?;
    let quarterly = store.load_table("quarterly_data")?;
    let fed = store.load_table("fed_liquidity")?;

    View::ALL
        .iter()
        .map(|view| {
            let table = match view {
                View::PrivateCreditImpulse => private_credit_impulse(&quarterly)?,
                View::MortgageCreditImpulse => mortgage_credit_impulse(&quarterly)?,
                View::ExcessLiquidity => excess_liquidity(&monthly, &quarterly)?,
                View::TotalLiquidity => total_liquidity(&fed, &monthly)?,
            };
            Ok::<_, ViewError>((view.name().to_string(), table))
        })
        .collect()
}
