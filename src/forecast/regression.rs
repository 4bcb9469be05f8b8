//! Ordinary least squares with an intercept.

use crate::error::ForecastError;
use crate::linalg;
use ndarray::{Array1, Array2, Axis};

/// A fitted linear model `y = intercept + x · coefficients`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearRegression {
    /// Fits by solving the normal equations on mean-centred data, which keeps
    /// the intercept out of the solved system.
    ///
    /// # Errors
    /// `InsufficientData` when there are fewer rows than parameters,
    /// `SingularMatrix` when the features are collinear or constant.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self, ForecastError> {
        let (rows, features) = x.dim();
        if y.len() != rows {
            return Err(ForecastError::DimensionMismatch {
                expected: rows,
                got: y.len(),
            });
        }
        if rows < features + 1 {
            return Err(ForecastError::InsufficientData {
                model: "ols".to_string(),
                rows,
                required: features + 1,
            });
        }

        let x_mean = x.mean_axis(Axis(0)).ok_or(ForecastError::SingularMatrix)?;
        let y_mean = y.mean().ok_or(ForecastError::SingularMatrix)?;
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let gram = xc.t().dot(&xc);
        let moment = xc.t().dot(&yc);
        let coefficients = linalg::solve(&gram, &moment).ok_or(ForecastError::SingularMatrix)?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        Ok(LinearRegression {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ForecastError> {
        if x.ncols() != self.coefficients.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Coefficient of determination.
///
/// `None` when the observed values have no variance (including a single
/// observation), where R² is undefined.
pub fn r2_score(observed: &Array1<f64>, predicted: &Array1<f64>) -> Option<f64> {
    if observed.len() != predicted.len() || observed.is_empty() {
        return None;
    }
    let mean = observed.mean()?;
    let ss_res: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).powi(2)).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    Some(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_recovers_exact_linear_relationship() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0], [5.0, 8.0]];
        let y: Array1<f64> = x.rows().into_iter().map(|r| 1.5 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let model = LinearRegression::fit(&x, &y).unwrap();

        assert!((model.intercept - 1.5).abs() < 1e-9);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-9);

        let predicted = model.predict(&array![[6.0, 0.0]]).unwrap();
        assert!((predicted[0] - 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_line_through_noisy_points() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 2.0, 4.0];
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!((model.coefficients[0] - 0.8).abs() < 1e-9);
        assert!((model.intercept - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_rows() {
        let x = array![[1.0, 2.0], [2.0, 3.0]];
        let y = array![1.0, 2.0];
        assert!(matches!(
            LinearRegression::fit(&x, &y),
            Err(ForecastError::InsufficientData { required: 3, .. })
        ));
    }

    #[test]
    fn test_constant_feature_is_singular() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(matches!(LinearRegression::fit(&x, &y), Err(ForecastError::SingularMatrix)));
    }

    #[test]
    fn test_predict_checks_width() {
        let model = LinearRegression {
            intercept: 0.0,
            coefficients: array![1.0, 1.0],
        };
        assert!(model.predict(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_r2_perfect_and_undefined() {
        let observed = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(&observed, &observed), Some(1.0));
        let mean_prediction = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(&observed, &mean_prediction), Some(0.0));
        assert_eq!(r2_score(&array![53.0], &array![53.5]), None);
    }
}
