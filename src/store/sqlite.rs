use super::{validate_column_name, validate_table_name, TableStore, DATE_COLUMN};
use crate::error::StoreError;
use crate::series::SeriesTable;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Transaction};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed table store.
///
/// Each dataset lives in its own table with a `"Date" TEXT PRIMARY KEY`
/// column (ISO `YYYY-MM-DD`) followed by one `REAL` column per series.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a file-based database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(SqliteStore { conn })
    }

    /// Creates a store over an in-memory database.
    ///
    /// Useful for testing.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// Returns a reference to the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Column names of an existing table, key column included, in table order.
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn check_identifiers(table: &str, data: &SeriesTable) -> Result<(), StoreError> {
    validate_table_name(table)?;
    for name in data.column_names() {
        validate_column_name(name)?;
    }
    Ok(())
}

fn create_table(tx: &Transaction<'_>, table: &str, data: &SeriesTable) -> Result<(), StoreError> {
    let mut columns = vec![format!("{} TEXT PRIMARY KEY", quote_identifier(DATE_COLUMN))];
    columns.extend(data.column_names().iter().map(|name| format!("{} REAL", quote_identifier(name))));
    tx.execute(
        &format!("CREATE TABLE {} ({})", quote_identifier(table), columns.join(", ")),
        [],
    )?;
    Ok(())
}

fn insert_rows(tx: &Transaction<'_>, table: &str, data: &SeriesTable) -> Result<usize, StoreError> {
    let names = data.column_names();
    let mut columns = vec![quote_identifier(DATE_COLUMN)];
    columns.extend(names.iter().map(|name| quote_identifier(name)));
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut stmt = tx.prepare(&sql)?;
    let mut inserted = 0;
    for (date, values) in data.rows() {
        let mut params = Vec::with_capacity(values.len() + 1);
        params.push(Value::Text(date.format(DATE_FORMAT).to_string()));
        params.extend(values.into_iter().map(|v| match v {
            Some(x) if x.is_finite() => Value::Real(x),
            _ => Value::Null,
        }));
        inserted += stmt.execute(params_from_iter(params)).map_err(|e| match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => StoreError::DuplicateDate {
                table: table.to_string(),
                date,
            },
            _ => StoreError::Sqlite(e),
        })?;
    }
    Ok(inserted)
}

fn parse_stored_date(text: &str) -> Result<NaiveDate, StoreError> {
    // pandas-written tables carry a time component
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| StoreError::InvalidDate(text.to_string()))
}

impl TableStore for SqliteStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
        Ok(stmt.exists([table])?)
    }

    fn max_date(&self, table: &str) -> Result<Option<NaiveDate>, StoreError> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(None);
        }
        let latest: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT MAX({}) FROM {}", quote_identifier(DATE_COLUMN), quote_identifier(table)),
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        latest.as_deref().map(parse_stored_date).transpose()
    }

    fn replace_table(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError> {
        check_identifiers(table, data)?;
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table)), [])?;
        create_table(&tx, table, data)?;
        let rows = insert_rows(&tx, table, data)?;
        tx.commit()?;
        Ok(rows)
    }

    fn append_rows(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError> {
        check_identifiers(table, data)?;
        let existing = if self.table_exists(table)? {
            Some(self.table_columns(table)?)
        } else {
            None
        };

        if let Some(columns) = &existing {
            if let Some(missing) = data.column_names().into_iter().find(|name| !columns.iter().any(|c| c.as_str() == *name)) {
                return Err(StoreError::SchemaMismatch {
                    table: table.to_string(),
                    column: missing.to_string(),
                });
            }
        }

        let tx = self.conn.transaction()?;
        if existing.is_none() {
            create_table(&tx, table, data)?;
        }
        let rows = insert_rows(&tx, table, data)?;
        tx.commit()?;
        Ok(rows)
    }

    fn load_table(&self, table: &str) -> Result<SeriesTable, StoreError> {
        validate_table_name(table)?;
        if !self.table_exists(table)? {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        let columns: Vec<String> = self
            .table_columns(table)?
            .into_iter()
            .filter(|c| c.as_str() != DATE_COLUMN)
            .collect();

        let mut select = vec![quote_identifier(DATE_COLUMN)];
        select.extend(columns.iter().map(|c| quote_identifier(c)));
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            select.join(", "),
            quote_identifier(table),
            quote_identifier(DATE_COLUMN)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let width = columns.len();
        let raw_rows = stmt
            .query_map([], |row| {
                let date: String = row.get(0)?;
                let mut values = Vec::with_capacity(width);
                for i in 1..=width {
                    values.push(row.get::<_, Option<f64>>(i)?);
                }
                Ok((date, values))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let rows = raw_rows
            .into_iter()
            .map(|(date, values)| Ok((parse_stored_date(&date)?, values)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(SeriesTable::from_rows(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> SeriesTable {
        SeriesTable::from_rows(
            vec!["S&P".to_string(), "Initial Claims".to_string()],
            vec![
                (d(2024, 1, 31), vec![Some(4_845.65), Some(210_000.0)]),
                (d(2024, 2, 29), vec![Some(5_096.27), None]),
            ],
        )
    }

    #[test]
    fn test_sqlite_store_creation_in_memory() {
        let store = SqliteStore::new_in_memory();
        assert!(store.is_ok());
        assert!(!store.unwrap().table_exists("gold").unwrap());
    }

    #[test]
    fn test_replace_and_load_preserves_nulls_and_names() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        assert_eq!(store.replace_table("financial_conditions", &sample()).unwrap(), 2);

        let loaded = store.load_table("financial_conditions").unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(store.max_date("financial_conditions").unwrap(), Some(d(2024, 2, 29)));
    }

    #[test]
    fn test_replace_drops_previous_schema() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.replace_table("model_1", &sample()).unwrap();
        let predictions = SeriesTable::from_raw("ISM Predicted", vec![(d(2024, 8, 31), Some(48.2))]);
        store.replace_table("model_1", &predictions).unwrap();

        let loaded = store.load_table("model_1").unwrap();
        assert_eq!(loaded.column_names(), vec!["ISM Predicted"]);
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_append_creates_then_extends() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let first = SeriesTable::from_raw("Gold Price", vec![(d(2024, 1, 7), Some(2_030.0))]);
        let second = SeriesTable::from_raw("Gold Price", vec![(d(2024, 1, 14), Some(2_045.0))]);
        store.append_rows("gold", &first).unwrap();
        store.append_rows("gold", &second).unwrap();

        assert_eq!(store.load_table("gold").unwrap().len(), 2);
        assert_eq!(store.max_date("gold").unwrap(), Some(d(2024, 1, 14)));
    }

    #[test]
    fn test_append_rejects_unknown_column_and_duplicate_date() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.replace_table("financial_conditions", &sample()).unwrap();

        let extra = SeriesTable::from_raw("VIX", vec![(d(2024, 3, 31), Some(13.0))]);
        assert!(matches!(
            store.append_rows("financial_conditions", &extra),
            Err(StoreError::SchemaMismatch { .. })
        ));

        let duplicate = SeriesTable::from_raw("S&P", vec![(d(2024, 2, 29), Some(1.0))]);
        assert!(matches!(
            store.append_rows("financial_conditions", &duplicate),
            Err(StoreError::DuplicateDate { .. })
        ));
        // failed transaction leaves the table untouched
        assert_eq!(store.load_table("financial_conditions").unwrap(), sample());
    }

    #[test]
    fn test_append_subset_of_columns() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store.replace_table("financial_conditions", &sample()).unwrap();
        let partial = SeriesTable::from_raw("S&P", vec![(d(2024, 3, 31), Some(5_254.35))]);
        store.append_rows("financial_conditions", &partial).unwrap();

        let loaded = store.load_table("financial_conditions").unwrap();
        assert_eq!(loaded.column("Initial Claims").unwrap()[2], None);
    }

    #[test]
    fn test_invalid_table_name_is_rejected() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            store.replace_table("bad name", &sample()),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_max_date_missing_table() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert_eq!(store.max_date("ism").unwrap(), None);
    }

    #[test]
    fn test_stored_date_with_time_component() {
        assert_eq!(parse_stored_date("2024-01-31 00:00:00").unwrap(), d(2024, 1, 31));
        assert!(parse_stored_date("31/01/2024").is_err());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let path = std::env::temp_dir().join(format!("macro_data_store_{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let mut store = SqliteStore::new(&path).unwrap();
            store.replace_table("rstar", &SeriesTable::from_raw("r*", vec![(d(2024, 6, 30), Some(0.74))])).unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.max_date("rstar").unwrap(), Some(d(2024, 6, 30)));
        let _ = std::fs::remove_file(&path);
    }
}
