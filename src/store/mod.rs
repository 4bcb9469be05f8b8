//! Persistent storage of date-indexed tables.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::series::SeriesTable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Name of the key column every stored table carries.
pub const DATE_COLUMN: &str = "Date";

/// Storage backend for ETL and forecast tables.
///
/// A stored table is keyed by `Date` (unique) and holds one nullable numeric
/// column per [`SeriesTable`] column.
pub trait TableStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Latest stored date, `None` when the table is missing or empty.
    fn max_date(&self, table: &str) -> Result<Option<NaiveDate>, StoreError>;

    /// Drops and recreates `table` with the contents of `data`.
    ///
    /// Returns the number of rows written.
    fn replace_table(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError>;

    /// Inserts every row of `data`, creating the table when it is missing.
    ///
    /// # Errors
    /// `StoreError::SchemaMismatch` when `data` has a column the stored table
    /// lacks; a storage-level error when a date is already present.
    fn append_rows(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError>;

    /// Reads a whole table back, ordered by date.
    fn load_table(&self, table: &str) -> Result<SeriesTable, StoreError>;
}

/// Checks that `name` is usable as a table name: ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Checks that a data column can be stored next to the date key.
pub fn validate_column_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('\0') || name.eq_ignore_ascii_case(DATE_COLUMN) {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// In-memory store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: BTreeMap<String, SeriesTable>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    fn check(table: &str, data: &SeriesTable) -> Result<(), StoreError> {
        validate_table_name(table)?;
        for name in data.column_names() {
            validate_column_name(name)?;
        }
        Ok(())
    }
}

impl TableStore for InMemoryStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.contains_key(table))
    }

    fn max_date(&self, table: &str) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.tables.get(table).and_then(SeriesTable::last_date))
    }

    fn replace_table(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError> {
        Self::check(table, data)?;
        self.tables.insert(table.to_string(), data.clone());
        Ok(data.len())
    }

    fn append_rows(&mut self, table: &str, data: &SeriesTable) -> Result<usize, StoreError> {
        Self::check(table, data)?;
        let Some(existing) = self.tables.get(table) else {
            self.tables.insert(table.to_string(), data.clone());
            return Ok(data.len());
        };

        if let Some(column) = data.column_names().into_iter().find(|c| !existing.has_column(c)) {
            return Err(StoreError::SchemaMismatch {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        if let Some(date) = data.index().iter().find(|date| existing.index().binary_search(*date).is_ok()) {
            return Err(StoreError::DuplicateDate {
                table: table.to_string(),
                date: *date,
            });
        }

        let names: Vec<String> = existing.column_names().iter().map(|c| c.to_string()).collect();
        let rows = existing
            .rows()
            .chain(data.rows().map(|(date, _)| {
                let values = names
                    .iter()
                    .map(|name| {
                        data.column(name)
                            .and_then(|values| data.index().binary_search(&date).ok().and_then(|pos| values[pos]))
                    })
                    .collect();
                (date, values)
            }))
            .collect();
        let merged = SeriesTable::from_rows(names, rows);
        self.tables.insert(table.to_string(), merged);
        Ok(data.len())
    }

    fn load_table(&self, table: &str) -> Result<SeriesTable, StoreError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }
}
