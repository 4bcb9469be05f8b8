//! Cubic upsampling of low-frequency series.
//!
//! Used once in the pipeline: the quarterly residential-investment share is
//! upsampled to month-end before it is lagged into the forecast feature set.
//! Everywhere else missing values are dropped, never filled.

use crate::calendar::Frequency;
use crate::linalg;
use crate::normalize::resample::period_boundaries;
use crate::series::SeriesTable;
use chrono::NaiveDate;
use ndarray::{Array1, Array2};

/// Upsamples every column of `table` onto `frequency` boundaries with a
/// not-a-knot cubic spline through the present observations.
///
/// Values are produced only between a column's first and last present
/// observation; nothing is extrapolated. Columns with fewer than four
/// observations fall back to linear interpolation.
pub fn upsample_cubic(table: &SeriesTable, frequency: Frequency) -> SeriesTable {
    let (Some(first), Some(last)) = (table.first_date(), table.last_date()) else {
        return table.clone();
    };

    let boundaries = period_boundaries(frequency, first, last);
    let names: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();

    let columns: Vec<Vec<Option<f64>>> = table
        .columns()
        .iter()
        .map(|column| {
            let knots: Vec<(f64, f64)> = table
                .index()
                .iter()
                .zip(&column.values)
                .filter_map(|(date, value)| value.map(|v| (day_number(frequency.period_end(*date)), v)))
                .collect();
            let spline = Spline::fit(&knots);
            boundaries
                .iter()
                .map(|date| spline.as_ref().and_then(|s| s.evaluate(day_number(*date))))
                .collect()
        })
        .collect();

    let rows = boundaries
        .iter()
        .enumerate()
        .map(|(pos, date)| (*date, columns.iter().map(|values| values[pos]).collect()))
        .collect();
    SeriesTable::from_rows(names, rows)
}

fn day_number(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    date.num_days_from_ce() as f64
}

/// Piecewise cubic in second-derivative form.
#[derive(Debug, Clone)]
struct Spline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot; all zero for the linear fallback
    m: Vec<f64>,
}

impl Spline {
    fn fit(knots: &[(f64, f64)]) -> Option<Self> {
        if knots.is_empty() {
            return None;
        }

        let x: Vec<f64> = knots.iter().map(|k| k.0).collect();
        let y: Vec<f64> = knots.iter().map(|k| k.1).collect();
        let n = x.len();

        if n < 4 {
            return Some(Spline { x, y, m: vec![0.0; n] });
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut a = Array2::<f64>::zeros((n, n));
        let mut b = Array1::<f64>::zeros(n);

        // not-a-knot: third derivative continuous across the second and
        // second-to-last knots
        a[[0, 0]] = -h[1];
        a[[0, 1]] = h[0] + h[1];
        a[[0, 2]] = -h[0];

        for i in 1..n - 1 {
            a[[i, i - 1]] = h[i - 1];
            a[[i, i]] = 2.0 * (h[i - 1] + h[i]);
            a[[i, i + 1]] = h[i];
            b[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let k = n - 2;
        a[[n - 1, k - 1]] = -h[k];
        a[[n - 1, k]] = h[k - 1] + h[k];
        a[[n - 1, k + 1]] = -h[k - 1];

        let m = linalg::solve(&a, &b)?;
        Some(Spline { x, y, m: m.to_vec() })
    }

    fn evaluate(&self, at: f64) -> Option<f64> {
        let n = self.x.len();
        if at < self.x[0] || at > self.x[n - 1] {
            return None;
        }
        if n == 1 {
            return Some(self.y[0]);
        }

        let i = match self.x.partition_point(|&xi| xi <= at) {
            0 => 0,
            p => (p - 1).min(n - 2),
        };

        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let left = x1 - at;
        let right = at - x0;

        Some(
            m0 * left.powi(3) / (6.0 * h)
                + m1 * right.powi(3) / (6.0 * h)
                + (y0 / h - m0 * h / 6.0) * left
                + (y1 / h - m1 * h / 6.0) * right,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_passes_through_knots_and_fills_months() {
        let table = SeriesTable::from_raw(
            "share",
            vec![
                (d(2023, 3, 31), Some(1.0)),
                (d(2023, 6, 30), Some(2.0)),
                (d(2023, 9, 30), Some(4.0)),
                (d(2023, 12, 31), Some(3.0)),
                (d(2024, 3, 31), Some(5.0)),
            ],
        );
        let monthly = upsample_cubic(&table, Frequency::Monthly);
        assert_eq!(monthly.len(), 13);
        let values = monthly.column("share").unwrap();
        assert!((values[0].unwrap() - 1.0).abs() < 1e-9);
        assert!((values[3].unwrap() - 2.0).abs() < 1e-9);
        assert!((values[12].unwrap() - 5.0).abs() < 1e-9);
        assert!(values.iter().all(Option::is_some));
    }

    #[test]
    fn test_reproduces_a_cubic_exactly() {
        // a single cubic is its own not-a-knot spline
        let f = |x: f64| 0.001 * x * x * x - 0.02 * x * x + x + 3.0;
        let knots: Vec<(f64, f64)> = [0.0, 3.0, 5.0, 9.0, 12.0].iter().map(|&x| (x, f(x))).collect();
        let spline = Spline::fit(&knots).unwrap();
        for x in [1.0, 4.5, 7.25, 11.0] {
            assert!((spline.evaluate(x).unwrap() - f(x)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_fallback_for_short_series() {
        let knots = vec![(0.0, 0.0), (10.0, 10.0)];
        let spline = Spline::fit(&knots).unwrap();
        assert_eq!(spline.evaluate(4.0), Some(4.0));
        assert_eq!(spline.evaluate(11.0), None);
    }

    #[test]
    fn test_does_not_extrapolate_past_last_observation() {
        let table = SeriesTable::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                (d(2023, 3, 31), vec![Some(1.0), Some(1.0)]),
                (d(2023, 6, 30), vec![Some(2.0), None]),
            ],
        );
        let monthly = upsample_cubic(&table, Frequency::Monthly);
        let b = monthly.column("b").unwrap();
        assert_eq!(b[0], Some(1.0));
        assert!(b[1..].iter().all(Option::is_none));
    }
}
