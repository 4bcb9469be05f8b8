//! Tables from official-sector publishers (IMF, BIS, NY Fed), Shiller's
//! valuation workbook, and the local historical bootstrap workbook.

use crate::calendar::month_end;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::series::{RawSeries, SeriesTable};
use crate::sources::bis::parse_sdmx_observations;
use crate::sources::imf::parse_cofer;
use crate::sources::spreadsheet::{parse_dated_sheet, parse_rstar, parse_shiller, Workbook};
use serde_json::Value;
use std::path::Path;

pub const DOLLAR_RESERVES_COLUMN: &str = "Dollar % Reserves";
pub const RSTAR_COLUMN: &str = "r*";

/// BIS reports debt securities in millions
const BIS_UNIT_DIVISOR: f64 = 1000.0;

pub const GSCPI_SHEET: &str = "GSCPI Monthly Data";
pub const RSTAR_SHEET: &str = "data";
pub const SHILLER_SHEET: &str = "Data";

/// Sheets of the historical bootstrap workbook
pub const BOOTSTRAP_GLOBAL_M2: &str = "Global M2";
pub const BOOTSTRAP_ISM: &str = "ISM";
pub const BOOTSTRAP_CRYPTO: &str = "Crypto";

pub async fn fetch_dollar_reserves(http: &HttpClient, url: &str) -> Result<SeriesTable, FetchError> {
    let payload: Value = http.get_json(url).await?;
    parse_cofer(&payload, DOLLAR_RESERVES_COLUMN)
}

/// Outer-joins the BIS `Total` and `USD` issuance series, in billions.
pub fn build_debt_securities(total: RawSeries, usd: RawSeries) -> SeriesTable {
    let mut table = SeriesTable::from_raw("Total Debt", total).outer_join(&SeriesTable::from_raw("USD Debt", usd));
    table.map_values(|v| v / BIS_UNIT_DIVISOR);
    table
}

pub async fn fetch_debt_securities(
    http: &HttpClient,
    total_url: &str,
    usd_url: &str,
) -> Result<SeriesTable, FetchError> {
    let total = parse_sdmx_observations(&http.get_bytes(total_url).await?)?;
    let usd = parse_sdmx_observations(&http.get_bytes(usd_url).await?)?;
    Ok(build_debt_securities(total, usd))
}

async fn download_workbook(http: &HttpClient, name: &str, url: &str) -> Result<Workbook, FetchError> {
    Workbook::from_bytes(name, http.get_bytes(url).await?)
}

pub async fn fetch_rstar(http: &HttpClient, url: &str) -> Result<SeriesTable, FetchError> {
    let mut workbook = download_workbook(http, "rstar", url).await?;
    let series = parse_rstar(&workbook.sheet(RSTAR_SHEET)?)?;
    Ok(SeriesTable::from_raw(RSTAR_COLUMN, series))
}

/// Global Supply Chain Pressure Index: `Date` and `GSCPI` columns, rows
/// missing either dropped, dates moved to month-end.
pub fn build_supply_chain(sheet: &SeriesTable) -> Result<SeriesTable, FetchError> {
    Ok(sheet.select(&["GSCPI"])?.drop_incomplete().map_index(month_end))
}

pub async fn fetch_supply_chain(http: &HttpClient, url: &str) -> Result<SeriesTable, FetchError> {
    let mut workbook = download_workbook(http, "GSCPI", url).await?;
    let sheet = parse_dated_sheet(&workbook.sheet(GSCPI_SHEET)?, "GSCPI")?;
    build_supply_chain(&sheet)
}

pub async fn fetch_shiller(http: &HttpClient, url: &str) -> Result<SeriesTable, FetchError> {
    let mut workbook = download_workbook(http, "shiller", url).await?;
    parse_shiller(&workbook.sheet(SHILLER_SHEET)?)
}

/// The historical workbook maintained alongside the database.
pub struct Bootstrap {
    workbook: Workbook,
}

impl Bootstrap {
    pub fn open(path: &Path) -> Result<Self, FetchError> {
        Ok(Bootstrap {
            workbook: Workbook::open(path)?,
        })
    }

    /// A `Date`-keyed sheet as a table.
    pub fn table(&mut self, sheet: &str) -> Result<SeriesTable, FetchError> {
        parse_dated_sheet(&self.workbook.sheet(sheet)?, sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_debt_securities_outer_join_in_billions() {
        let total = vec![(d(2024, 3, 31), Some(30_000_000.0)), (d(2024, 6, 30), Some(30_500_000.0))];
        let usd = vec![(d(2024, 6, 30), Some(14_000_000.0))];
        let table = build_debt_securities(total, usd);
        assert_eq!(table.column("Total Debt").unwrap(), &[Some(30_000.0), Some(30_500.0)]);
        assert_eq!(table.column("USD Debt").unwrap(), &[None, Some(14_000.0)]);
    }

    #[test]
    fn test_supply_chain_keeps_complete_rows_at_month_end() {
        let sheet = SeriesTable::from_rows(
            vec!["GSCPI".to_string(), "Notes".to_string()],
            vec![
                (d(2024, 1, 31), vec![Some(-0.15), None]),
                (d(2024, 2, 1), vec![None, Some(1.0)]),
                (d(2024, 3, 1), vec![Some(0.02), None]),
            ],
        );
        let table = build_supply_chain(&sheet).unwrap();
        assert_eq!(table.index(), &[d(2024, 1, 31), d(2024, 3, 31)]);
        assert_eq!(table.column_names(), vec!["GSCPI"]);
    }

    #[test]
    fn test_supply_chain_without_column_fails() {
        let sheet = SeriesTable::from_raw("Index", vec![(d(2024, 1, 31), Some(1.0))]);
        assert!(build_supply_chain(&sheet).is_err());
    }
}
