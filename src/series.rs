use crate::error::SeriesError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw provider output: one optional value per date.
pub type RawSeries = Vec<(NaiveDate, Option<f64>)>;

/// A named numeric column. `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Date-indexed table of named numeric columns.
///
/// The index is unique and strictly increasing; every column holds exactly
/// one value per index entry. Gaps between dates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesTable {
    index: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl SeriesTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        SeriesTable::default()
    }

    /// Builds a table from unordered rows.
    ///
    /// Rows are sorted by date; when a date repeats, the later row wins.
    /// Short rows are padded with `None`.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<(NaiveDate, Vec<Option<f64>>)>) -> Self {
        let width = column_names.len();
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (date, mut values) in rows {
            values.resize(width, None);
            by_date.insert(date, values);
        }

        let mut columns: Vec<Column> = column_names
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(by_date.len()),
            })
            .collect();
        let mut index = Vec::with_capacity(by_date.len());

        for (date, values) in by_date {
            index.push(date);
            for (column, value) in columns.iter_mut().zip(values) {
                column.values.push(value);
            }
        }

        SeriesTable { index, columns }
    }

    /// Builds a single-column table from raw provider output.
    pub fn from_raw(name: &str, raw: RawSeries) -> Self {
        let rows = raw.into_iter().map(|(date, value)| (date, vec![value])).collect();
        SeriesTable::from_rows(vec![name.to_string()], rows)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of the named column, if present.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of the named column, or a `MissingColumn` error.
    pub fn require(&self, name: &str) -> Result<&[Option<f64>], SeriesError> {
        self.column(name)
            .ok_or_else(|| SeriesError::MissingColumn(name.to_string()))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Values of row `position`, in column order.
    pub fn row(&self, position: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|c| c.values[position]).collect()
    }

    /// Iterates `(date, row values)` in index order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<Option<f64>>)> + '_ {
        self.index
            .iter()
            .enumerate()
            .map(move |(position, date)| (*date, self.row(position)))
    }

    /// Adds a column aligned to the existing index, replacing any column of
    /// the same name.
    ///
    /// An empty table without columns has no index yet; use
    /// [`SeriesTable::assign`] to seed one.
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), SeriesError> {
        if values.len() != self.index.len() {
            return Err(SeriesError::LengthMismatch {
                column: name.to_string(),
                expected: self.index.len(),
                got: values.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    /// Assigns column `column` of `source` under `name`.
    ///
    /// When this table has no columns yet, it adopts `source`'s index;
    /// otherwise the values are left-aligned onto the existing index, and
    /// dates absent from `source` become `None`.
    pub fn assign(&mut self, name: &str, source: &SeriesTable, column: &str) -> Result<(), SeriesError> {
        let values = source.require(column)?;

        if self.columns.is_empty() {
            self.index = source.index.clone();
            return self.set_column(name, values.to_vec());
        }

        let lookup = source.position_map();
        let aligned = self
            .index
            .iter()
            .map(|date| lookup.get(date).and_then(|&pos| values[pos]))
            .collect();
        self.set_column(name, aligned)
    }

    /// Renames a column in place.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), SeriesError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| SeriesError::MissingColumn(from.to_string()))?;
        column.name = to.to_string();
        Ok(())
    }

    /// Applies `f` to every present value of a column.
    pub fn map_column<F>(&mut self, name: &str, f: F) -> Result<(), SeriesError>
    where
        F: Fn(f64) -> f64,
    {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SeriesError::MissingColumn(name.to_string()))?;
        for value in column.values.iter_mut() {
            *value = value.map(&f);
        }
        Ok(())
    }

    /// Applies `f` to every present value of every column.
    pub fn map_values<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for column in self.columns.iter_mut() {
            for value in column.values.iter_mut() {
                *value = value.map(&f);
            }
        }
    }

    /// Replaces missing values of a column with `fill`.
    pub fn fill_missing(&mut self, name: &str, fill: f64) -> Result<(), SeriesError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SeriesError::MissingColumn(name.to_string()))?;
        for value in column.values.iter_mut() {
            if value.is_none() {
                *value = Some(fill);
            }
        }
        Ok(())
    }

    /// Keeps the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<SeriesTable, SeriesError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(Column {
                name: name.to_string(),
                values: self.require(name)?.to_vec(),
            });
        }
        Ok(SeriesTable {
            index: self.index.clone(),
            columns,
        })
    }

    /// Keeps rows whose date satisfies `predicate`.
    pub fn filter_dates<P>(&self, predicate: P) -> SeriesTable
    where
        P: Fn(NaiveDate) -> bool,
    {
        let keep: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, date)| predicate(**date))
            .map(|(pos, _)| pos)
            .collect();
        self.take_rows(&keep)
    }

    /// Rows with a date strictly after `date`.
    pub fn after(&self, date: NaiveDate) -> SeriesTable {
        self.filter_dates(|d| d > date)
    }

    /// Rows strictly after `cutoff`, or the whole table when there is none.
    pub fn rows_after(&self, cutoff: Option<NaiveDate>) -> SeriesTable {
        match cutoff {
            Some(date) => self.after(date),
            None => self.clone(),
        }
    }

    /// Drops every row with at least one missing value.
    pub fn drop_incomplete(&self) -> SeriesTable {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&pos| self.columns.iter().all(|c| c.values[pos].is_some()))
            .collect();
        self.take_rows(&keep)
    }

    /// Drops rows missing a value in any of `names`.
    pub fn drop_incomplete_in(&self, names: &[&str]) -> Result<SeriesTable, SeriesError> {
        let targets: Vec<&[Option<f64>]> = names
            .iter()
            .map(|name| self.require(name))
            .collect::<Result<_, _>>()?;
        let keep: Vec<usize> = (0..self.len())
            .filter(|&pos| targets.iter().all(|values| values[pos].is_some()))
            .collect();
        Ok(self.take_rows(&keep))
    }

    /// Drops the most recent row if any of its values is missing.
    ///
    /// Providers publish the latest period piecemeal; a partially filled
    /// last row is treated as not yet final.
    pub fn drop_trailing_incomplete(&mut self) {
        let Some(last) = self.len().checked_sub(1) else {
            return;
        };
        if self.columns.iter().any(|c| c.values[last].is_none()) {
            self.index.pop();
            for column in self.columns.iter_mut() {
                column.values.pop();
            }
        }
    }

    /// Re-keys every row through `f`.
    ///
    /// The result is re-sorted; if two rows land on the same date the later
    /// one wins.
    pub fn map_index<F>(&self, f: F) -> SeriesTable
    where
        F: Fn(NaiveDate) -> NaiveDate,
    {
        let names = self.columns.iter().map(|c| c.name.clone()).collect();
        let rows = self.rows().map(|(date, values)| (f(date), values)).collect();
        SeriesTable::from_rows(names, rows)
    }

    /// Columns of `other` aligned onto this table's index.
    pub fn left_join(&self, other: &SeriesTable) -> SeriesTable {
        let lookup = other.position_map();
        let mut joined = self.clone();
        for column in &other.columns {
            let values = self
                .index
                .iter()
                .map(|date| lookup.get(date).and_then(|&pos| column.values[pos]))
                .collect();
            joined.upsert_column(&column.name, values);
        }
        joined
    }

    /// Union of both indexes with the columns of both tables.
    pub fn outer_join(&self, other: &SeriesTable) -> SeriesTable {
        let mut dates: Vec<NaiveDate> = self.index.iter().chain(other.index.iter()).copied().collect();
        dates.sort_unstable();
        dates.dedup();

        let scaffold = SeriesTable {
            index: dates,
            columns: Vec::new(),
        };
        scaffold.left_join(self).left_join(other)
    }

    /// Dates present in both tables, with the columns of both.
    pub fn inner_join(&self, other: &SeriesTable) -> SeriesTable {
        let lookup = other.position_map();
        let shared: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, date)| lookup.contains_key(*date))
            .map(|(pos, _)| pos)
            .collect();
        self.take_rows(&shared).left_join(other)
    }

    /// Appends the rows of `tail` dated strictly after this table's last date.
    ///
    /// Columns are matched by name; columns only one side has are filled with
    /// `None` on the other side.
    pub fn concat(&self, tail: &SeriesTable) -> SeriesTable {
        let tail = self.last_date().map_or_else(|| tail.clone(), |last| tail.after(last));

        let mut names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        for column in &tail.columns {
            if !names.contains(&column.name) {
                names.push(column.name.clone());
            }
        }

        let mut index = self.index.clone();
        index.extend_from_slice(&tail.index);

        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = match self.column(&name) {
                    Some(head) => head.to_vec(),
                    None => vec![None; self.len()],
                };
                match tail.column(&name) {
                    Some(rest) => values.extend_from_slice(rest),
                    None => values.extend(std::iter::repeat(None).take(tail.len())),
                }
                Column { name, values }
            })
            .collect();

        SeriesTable { index, columns }
    }

    fn upsert_column(&mut self, name: &str, values: Vec<Option<f64>>) {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    fn take_rows(&self, positions: &[usize]) -> SeriesTable {
        SeriesTable {
            index: positions.iter().map(|&pos| self.index[pos]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: positions.iter().map(|&pos| c.values[pos]).collect(),
                })
                .collect(),
        }
    }

    fn position_map(&self) -> HashMap<NaiveDate, usize> {
        self.index
            .iter()
            .enumerate()
            .map(|(pos, date)| (*date, pos))
            .collect()
    }
}
