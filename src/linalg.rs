//! Dense linear solves for the spline and regression code.

use ndarray::{Array1, Array2};

const PIVOT_EPSILON: f64 = 1e-12;

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `a` is not square, the shapes disagree, or a pivot
/// vanishes (singular system).
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return None;
    }

    let mut m = a.clone();
    let mut rhs = b.clone();
    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| {
            m[[i, col]]
                .abs()
                .partial_cmp(&m[[j, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        if m[[pivot_row, col]].abs() <= PIVOT_EPSILON * scale {
            return None;
        }

        if pivot_row != col {
            for k in 0..n {
                m.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[[row, k]] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[[row, row]];
    }

    Some(x)
}
