//! Excel workbooks (xls/xlsx) published by data providers, plus the local
//! historical bootstrap workbook.
//!
//! Parsers operate on a single sheet's [`Range`] so they can be exercised
//! without a file.

use crate::calendar::{month_end, quarter_end};
use crate::error::FetchError;
use crate::normalize::primitives::{ratio, shift};
use crate::normalize::windows::TrailingWindow;
use crate::series::{RawSeries, SeriesTable};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::io::Cursor;
use std::path::Path;

/// An opened workbook held in memory.
pub struct Workbook {
    name: String,
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    /// Opens a workbook from downloaded bytes; the format is sniffed.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, FetchError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| FetchError::Spreadsheet(format!("{}: {}", name, e)))?;
        Ok(Workbook {
            name: name.to_string(),
            sheets,
        })
    }

    /// Reads and opens a workbook on disk.
    pub fn open(path: &Path) -> Result<Self, FetchError> {
        let bytes = std::fs::read(path)
            .map_err(|e| FetchError::Spreadsheet(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&path.display().to_string(), bytes)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Cells of the sheet called `sheet`.
    pub fn sheet(&mut self, sheet: &str) -> Result<Range<Data>, FetchError> {
        self.sheets
            .worksheet_range(sheet)
            .map_err(|e| FetchError::Spreadsheet(format!("{} sheet '{}': {}", self.name, sheet, e)))
    }

    /// Cells of the first sheet.
    pub fn first_sheet(&mut self) -> Result<Range<Data>, FetchError> {
        let first = self
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Spreadsheet(format!("{} has no sheets", self.name)))?;
        self.sheet(&first)
    }
}

/// Numeric cell value; numeric text is accepted, everything else is missing.
pub fn cell_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(v) if v.is_finite() => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Text cell value, trimmed.
pub fn cell_text(cell: &Data) -> Option<&str> {
    match cell {
        Data::String(s) => Some(s.trim()),
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%b-%Y", "%d-%b-%y"];

/// Date cell value: Excel date-times, ISO strings, common text formats, and
/// bare serial numbers (1900 date system).
pub fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.date()),
        Data::DateTimeIso(s) => parse_date_text(s),
        Data::String(s) => parse_date_text(s),
        Data::Float(serial) => serial_to_date(*serial),
        Data::Int(serial) => serial_to_date(*serial as f64),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        // month-year labels such as "Jan-2024" carry no day
        .or_else(|| NaiveDate::parse_from_str(&format!("01-{}", text), "%d-%b-%Y").ok())
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Serials below 61 fall before Excel's phantom 1900-02-29; the data here
    // is far later
    if !(61.0..2_958_466.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Position of the first row satisfying `predicate`.
fn find_row<F>(range: &Range<Data>, predicate: F) -> Option<usize>
where
    F: Fn(&[Data]) -> bool,
{
    range.rows().position(|row| predicate(row))
}

static EMPTY_CELL: Data = Data::Empty;

fn cell(row: &[Data], col: usize) -> &Data {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

/// Parses a sheet laid out as a `Date` header column followed by named
/// numeric columns, as in the bootstrap workbook and the GSCPI download.
///
/// The header row is the first row whose cells include `"Date"`. Rows whose
/// date cell does not parse are skipped; unnamed columns are ignored.
pub fn parse_dated_sheet(range: &Range<Data>, source_name: &str) -> Result<SeriesTable, FetchError> {
    let header_pos = find_row(range, |row| row.iter().any(|c| cell_text(c) == Some("Date")))
        .ok_or_else(|| FetchError::SchemaDrift {
            source_name: source_name.to_string(),
            detail: "no 'Date' header row".to_string(),
        })?;

    let header: Vec<Data> = range.rows().nth(header_pos).map(<[Data]>::to_vec).unwrap_or_default();
    let date_col = header
        .iter()
        .position(|c| cell_text(c) == Some("Date"))
        .unwrap_or(0);
    let value_cols: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(col, _)| *col != date_col)
        .filter_map(|(col, c)| match c {
            Data::String(s) if !s.trim().is_empty() => Some((col, s.trim().to_string())),
            _ => None,
        })
        .collect();

    let rows = range
        .rows()
        .skip(header_pos + 1)
        .filter_map(|row| {
            let date = cell_date(cell(row, date_col))?;
            Some((date, value_cols.iter().map(|(col, _)| cell_f64(cell(row, *col))).collect()))
        })
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(FetchError::EmptyPayload(source_name.to_string()));
    }

    let names = value_cols.into_iter().map(|(_, name)| name).collect();
    Ok(SeriesTable::from_rows(names, rows))
}

/// Column holding the spot price in the gold workbook
const GOLD_PRICE_COL: usize = 5;

/// Daily spot gold from the Auronum workbook.
///
/// The date column is headed `"USD/Gold"`; the USD price sits in the sixth
/// column under an empty header.
pub fn parse_gold_spot(range: &Range<Data>) -> Result<RawSeries, FetchError> {
    let drift = |detail: &str| FetchError::SchemaDrift {
        source_name: "gold spot".to_string(),
        detail: detail.to_string(),
    };

    let header_pos = find_row(range, |row| row.iter().any(|c| cell_text(c) == Some("USD/Gold")))
        .ok_or_else(|| drift("no 'USD/Gold' header"))?;
    let date_col = range
        .rows()
        .nth(header_pos)
        .and_then(|row| row.iter().position(|c| cell_text(c) == Some("USD/Gold")))
        .ok_or_else(|| drift("no 'USD/Gold' header"))?;

    let series: RawSeries = range
        .rows()
        .skip(header_pos + 1)
        .filter_map(|row| Some((cell_date(cell(row, date_col))?, cell_f64(cell(row, GOLD_PRICE_COL)))))
        .collect();

    if series.is_empty() {
        return Err(FetchError::EmptyPayload("gold spot".to_string()));
    }
    Ok(series)
}

/// Column holding r* in the Laubach–Williams estimates sheet
const RSTAR_COL: usize = 2;

/// Quarterly r* estimates from the NY Fed Laubach–Williams workbook.
///
/// Data starts below the first row reading `Date` in column A and `rstar`
/// in column C. Without that marker row the file layout has changed and
/// the result is `FetchError::SchemaDrift`.
pub fn parse_rstar(range: &Range<Data>) -> Result<RawSeries, FetchError> {
    let marker = find_row(range, |row| {
        cell_text(cell(row, 0)) == Some("Date") && cell_text(cell(row, RSTAR_COL)) == Some("rstar")
    })
    .ok_or_else(|| FetchError::SchemaDrift {
        source_name: "rstar".to_string(),
        detail: "marker row with 'Date' and 'rstar' not found".to_string(),
    })?;

    let series: RawSeries = range
        .rows()
        .skip(marker + 1)
        .filter_map(|row| {
            let date = cell_date(cell(row, 0))?;
            Some((quarter_end(date), cell_f64(cell(row, RSTAR_COL))))
        })
        .collect();

    if series.is_empty() {
        return Err(FetchError::EmptyPayload("rstar".to_string()));
    }
    Ok(series)
}

/// First month kept from the Shiller sheet
const SHILLER_FIRST_YEAR: i32 = 1900;
const SHILLER_SP_COL: usize = 1;
const SHILLER_REAL_SP_COL: usize = 7;
const SHILLER_REAL_EARNINGS_COL: usize = 10;
const SHILLER_CAPE_COL: usize = 12;

/// Month-end date for Shiller's fractional `YYYY.MM` encoding, where
/// `1871.1` is October and `1871.01` January.
pub fn shiller_date(value: f64) -> Option<NaiveDate> {
    let year = value.trunc();
    let month = ((value - year) * 100.0).round() as u32;
    NaiveDate::from_ymd_opt(year as i32, month, 1).map(month_end)
}

/// Monthly S&P 500 valuation data from Robert Shiller's `ie_data` sheet.
///
/// Adds `TTM Real Earnings`, the mean of the previous twelve months of real
/// earnings (current month excluded, one observation suffices), and
/// `TTM P/E Ratio` = `Real S&P / TTM Real Earnings`.
pub fn parse_shiller(range: &Range<Data>) -> Result<SeriesTable, FetchError> {
    let rows: Vec<_> = range
        .rows()
        .filter_map(|row| {
            let date = cell_f64(cell(row, 0)).and_then(shiller_date)?;
            (date.year() >= SHILLER_FIRST_YEAR).then(|| {
                (
                    date,
                    vec![
                        cell_f64(cell(row, SHILLER_SP_COL)),
                        cell_f64(cell(row, SHILLER_REAL_SP_COL)),
                        cell_f64(cell(row, SHILLER_REAL_EARNINGS_COL)),
                        cell_f64(cell(row, SHILLER_CAPE_COL)),
                    ],
                )
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(FetchError::SchemaDrift {
            source_name: "shiller".to_string(),
            detail: format!("no monthly rows from {} in column A", SHILLER_FIRST_YEAR),
        });
    }

    let mut table = SeriesTable::from_rows(
        vec![
            "S&P".to_string(),
            "Real S&P".to_string(),
            "Real Earnings".to_string(),
            "Shiller CAPE P/E Ratio".to_string(),
        ],
        rows,
    );

    let earnings = shift(table.require("Real Earnings")?, 1);
    let ttm = TrailingWindow::new(12).with_min_periods(1).mean(&earnings);
    let pe = ratio(table.require("Real S&P")?, &ttm);
    table.set_column("TTM Real Earnings", ttm)?;
    table.set_column("TTM P/E Ratio", pe)?;
    Ok(table)
}
