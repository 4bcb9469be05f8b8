//! Writes in-memory tables to the store, either replacing them or appending
//! only the rows newer than what is already stored.

use crate::error::StoreError;
use crate::series::SeriesTable;
use crate::store::{TableStore, DATE_COLUMN};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DEBUG_DIR: &str = "debug";
/// File name of the debug workbook
pub const DEBUG_WORKBOOK: &str = "data_debug.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Drop and recreate every table
    Full,
    /// Append rows dated after the stored maximum
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Replaced { rows: usize },
    Appended { rows: usize },
    UpToDate,
}

impl LoadOutcome {
    pub fn rows_written(&self) -> usize {
        match self {
            LoadOutcome::Replaced { rows } | LoadOutcome::Appended { rows } => *rows,
            LoadOutcome::UpToDate => 0,
        }
    }
}

/// Loads one table.
///
/// In incremental mode the stored maximum date is looked up and only strictly
/// later rows are appended; a missing table receives every row.
pub fn load_table<S: TableStore + ?Sized>(
    store: &mut S,
    table: &str,
    data: &SeriesTable,
    mode: LoadMode,
) -> Result<LoadOutcome, StoreError> {
    match mode {
        LoadMode::Full => {
            let rows = store.replace_table(table, data)?;
            info!("Table '{}' created.", table);
            Ok(LoadOutcome::Replaced { rows })
        }
        LoadMode::Incremental => {
            let last = store.max_date(table)?;
            let fresh = data.rows_after(last);
            if fresh.is_empty() {
                info!("No new data for table '{}'.", table);
                return Ok(LoadOutcome::UpToDate);
            }
            let rows = store.append_rows(table, &fresh)?;
            info!("Appended {} new rows to table '{}'.", rows, table);
            Ok(LoadOutcome::Appended { rows })
        }
    }
}

/// Loads every table in order. The first storage error aborts the run.
pub fn load_all<S: TableStore + ?Sized>(
    store: &mut S,
    tables: &[(String, SeriesTable)],
    mode: LoadMode,
) -> Result<Vec<(String, LoadOutcome)>, StoreError> {
    tables
        .iter()
        .map(|(name, data)| Ok::<_, StoreError>((name.clone(), load_table(store, name, data, mode)?)))
        .collect()
}

/// Path of the CSV mirror of `table`.
pub fn mirror_path(data_dir: &Path, table: &str) -> PathBuf {
    data_dir.join(DEBUG_DIR).join(format!("{}.csv", table))
}

/// Writes each table to `<dir>/<table>.csv`, creating `dir` if needed.
pub fn write_csv_tables(dir: &Path, tables: &[(String, SeriesTable)]) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    for (name, table) in tables {
        let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", name)))?;
        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(table.column_names().iter().map(|c| c.to_string()));
        writer.write_record(&header)?;
        for (date, values) in table.rows() {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(())
}

/// Writes every table into one workbook at `path`, one sheet per table
/// named after it. Each sheet starts with a `Date` column; missing values are
/// left as empty cells.
pub fn write_workbook(path: &Path, tables: &[(String, SeriesTable)]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    for (name, table) in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.write_string(0, 0, DATE_COLUMN)?;
        for (col, column) in table.column_names().iter().enumerate() {
            sheet.write_string(0, sheet_col(col + 1)?, *column)?;
        }
        for (row, (date, values)) in table.rows().enumerate() {
            let row = u32::try_from(row + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            sheet.write_string(row, 0, date.format("%Y-%m-%d").to_string())?;
            for (col, value) in values.iter().enumerate() {
                if let Some(value) = value.filter(|v| v.is_finite()) {
                    sheet.write_number(row, sheet_col(col + 1)?, value)?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

fn sheet_col(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Path of the debug workbook.
pub fn debug_workbook_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DEBUG_DIR).join(DEBUG_WORKBOOK)
}

/// Mirrors every table under `<data_dir>/debug`: one CSV per table plus a
/// single workbook with one sheet per table.
pub fn mirror_debug(data_dir: &Path, tables: &[(String, SeriesTable)]) -> Result<(), StoreError> {
    let dir = data_dir.join(DEBUG_DIR);
    write_csv_tables(&dir, tables)?;
    let workbook = debug_workbook_path(data_dir);
    write_workbook(&workbook, tables)?;
    info!("Debug data saved to {} ({} tables).", workbook.display(), tables.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::spreadsheet::{parse_dated_sheet, Workbook};
    use crate::store::InMemoryStore;
    use calamine::Data;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekly(dates: &[NaiveDate]) -> SeriesTable {
        SeriesTable::from_raw("Nasdaq", dates.iter().enumerate().map(|(i, d)| (*d, Some(i as f64))).collect())
    }

    #[test]
    fn test_incremental_appends_only_newer_rows() {
        let mut store = InMemoryStore::new();
        let dates = [d(2024, 1, 5), d(2024, 1, 12), d(2024, 1, 19)];
        store.replace_table("nasdaq", &weekly(&dates[..2])).unwrap();

        let outcome = load_table(&mut store, "nasdaq", &weekly(&dates), LoadMode::Incremental).unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { rows: 1 });
        assert_eq!(store.load_table("nasdaq").unwrap().len(), 3);

        let again = load_table(&mut store, "nasdaq", &weekly(&dates), LoadMode::Incremental).unwrap();
        assert_eq!(again, LoadOutcome::UpToDate);
        assert_eq!(again.rows_written(), 0);
    }

    #[test]
    fn test_incremental_creates_missing_table() {
        let mut store = InMemoryStore::new();
        let outcome = load_table(&mut store, "nasdaq", &weekly(&[d(2024, 1, 5)]), LoadMode::Incremental).unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { rows: 1 });
    }

    #[test]
    fn test_full_replaces_contents() {
        let mut store = InMemoryStore::new();
        store.replace_table("nasdaq", &weekly(&[d(2023, 1, 6), d(2023, 1, 13)])).unwrap();
        let outcome = load_table(&mut store, "nasdaq", &weekly(&[d(2024, 1, 5)]), LoadMode::Full).unwrap();
        assert_eq!(outcome, LoadOutcome::Replaced { rows: 1 });
        assert_eq!(store.load_table("nasdaq").unwrap().index(), &[d(2024, 1, 5)]);
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("macro_data_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn test_mirror_writes_one_csv_per_table() {
        let dir = scratch_dir("mirror_csv");
        let table = SeriesTable::from_raw("r*", vec![(d(2024, 3, 31), Some(0.7)), (d(2024, 6, 30), None)]);
        mirror_debug(&dir, &[("rstar".to_string(), table)]).unwrap();

        let written = fs::read_to_string(mirror_path(&dir, "rstar")).unwrap();
        assert_eq!(written, "Date,r*\n2024-03-31,0.7\n2024-06-30,\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_mirror_writes_workbook_with_sheet_per_table() {
        let dir = scratch_dir("mirror_xlsx");
        let rstar = SeriesTable::from_raw("r*", vec![(d(2024, 3, 31), Some(0.74)), (d(2024, 6, 30), None)]);
        let gold = SeriesTable::from_rows(
            vec!["Gold Price".to_string(), "GLD".to_string()],
            vec![(d(2024, 1, 7), vec![Some(2_030.25), Some(187.5)])],
        );
        let tables = vec![("rstar".to_string(), rstar.clone()), ("gold".to_string(), gold.clone())];
        mirror_debug(&dir, &tables).unwrap();

        let mut workbook = Workbook::open(&debug_workbook_path(&dir)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["rstar".to_string(), "gold".to_string()]);

        let range = workbook.sheet("rstar").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Date".to_string())));
        assert_eq!(parse_dated_sheet(&range, "rstar").unwrap(), rstar);
        let read_gold = parse_dated_sheet(&workbook.sheet("gold").unwrap(), "gold").unwrap();
        assert_eq!(read_gold.column("Gold Price").unwrap(), &[Some(2_030.25)]);
        assert_eq!(read_gold, gold);
        let _ = fs::remove_dir_all(&dir);
    }
}
