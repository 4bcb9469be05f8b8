//! Frequency conversion onto canonical period boundaries.

use crate::calendar::Frequency;
use crate::series::{Column, SeriesTable};
use chrono::NaiveDate;

/// How observations falling in the same period are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Mean of the present values.
    Mean,
    /// Last present value in date order.
    Last,
}

/// Resamples `table` onto `frequency` boundaries.
///
/// Output rows run contiguously from the boundary of the first observation
/// to the boundary of the last; a period without any present value for a
/// column yields `None` for that column.
pub fn resample(table: &SeriesTable, frequency: Frequency, aggregation: Aggregation) -> SeriesTable {
    let (Some(first), Some(last)) = (table.first_date(), table.last_date()) else {
        return table.clone();
    };

    let boundaries = period_boundaries(frequency, first, last);
    let mut bucket_of = Vec::with_capacity(table.len());
    let mut bucket = 0;
    for date in table.index() {
        let boundary = frequency.period_end(*date);
        while boundaries[bucket] < boundary {
            bucket += 1;
        }
        bucket_of.push(bucket);
    }

    let names: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    let aggregated: Vec<Column> = table
        .columns()
        .iter()
        .map(|column| Column {
            name: column.name.clone(),
            values: aggregate_column(&column.values, &bucket_of, boundaries.len(), aggregation),
        })
        .collect();

    let rows = boundaries
        .iter()
        .enumerate()
        .map(|(pos, date)| (*date, aggregated.iter().map(|c| c.values[pos]).collect()))
        .collect();
    SeriesTable::from_rows(names, rows)
}

/// Every boundary from the period containing `first` to the one containing `last`.
pub fn period_boundaries(frequency: Frequency, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let end = frequency.period_end(last);
    let mut current = frequency.period_end(first);
    let mut boundaries = vec![current];
    while current < end {
        current = frequency.next_period_end(current);
        boundaries.push(current);
    }
    boundaries
}

fn aggregate_column(
    values: &[Option<f64>],
    bucket_of: &[usize],
    buckets: usize,
    aggregation: Aggregation,
) -> Vec<Option<f64>> {
    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];
    let mut lasts = vec![None; buckets];

    for (value, &bucket) in values.iter().zip(bucket_of) {
        if let Some(v) = value {
            sums[bucket] += v;
            counts[bucket] += 1;
            lasts[bucket] = Some(*v);
        }
    }

    match aggregation {
        Aggregation::Mean => sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
            .collect(),
        Aggregation::Last => lasts,
    }
}
