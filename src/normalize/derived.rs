//! Derived indicator columns.
//!
//! Derived columns are a pure function of their table's raw columns and are
//! recomputed on every run.

use crate::calendar::Frequency;
use crate::error::SeriesError;
use crate::normalize::primitives::{diff, difference, pct_change_percent, ratio, scale};
use crate::normalize::windows::rolling_mean;
use crate::series::SeriesTable;

/// Year-over-year percent change for a series sampled at `frequency`.
pub fn yoy_percent(values: &[Option<f64>], frequency: Frequency) -> Vec<Option<f64>> {
    pct_change_percent(values, frequency.periods_per_year())
}

/// Adds `target` = YoY % of `source`.
pub fn add_yoy(
    table: &mut SeriesTable,
    source: &str,
    target: &str,
    frequency: Frequency,
) -> Result<(), SeriesError> {
    let values = yoy_percent(table.require(source)?, frequency);
    table.set_column(target, values)
}

/// Adds `target` = trailing mean of `source` over `window` periods.
pub fn add_rolling_mean(
    table: &mut SeriesTable,
    source: &str,
    target: &str,
    window: usize,
) -> Result<(), SeriesError> {
    let values = rolling_mean(table.require(source)?, window);
    table.set_column(target, values)
}

/// Adds `target` = `numerator / denominator`.
pub fn add_ratio(
    table: &mut SeriesTable,
    numerator: &str,
    denominator: &str,
    target: &str,
) -> Result<(), SeriesError> {
    let values = ratio(table.require(numerator)?, table.require(denominator)?);
    table.set_column(target, values)
}

/// Adds `target` = `left - right`.
pub fn add_difference(
    table: &mut SeriesTable,
    left: &str,
    right: &str,
    target: &str,
) -> Result<(), SeriesError> {
    let values = difference(table.require(left)?, table.require(right)?);
    table.set_column(target, values)
}

/// Parameters of a credit impulse: the change in new credit creation,
/// normalised by output.
///
/// The spans are the discrete analogue of a second derivative and carry
/// economic meaning; they must match the series' sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditImpulseSpec {
    /// Span of the first difference (credit flow)
    pub first_span: usize,
    /// Span of the difference of the flow
    pub second_span: usize,
    /// Multiplier applied after dividing by the denominator (100 for percent)
    pub scale: f64,
    /// Trailing mean window applied last
    pub smoothing: usize,
}

impl CreditImpulseSpec {
    /// Quarterly private credit: 6-month flow, its 6-month change, % of GDP, 6-period mean.
    pub const PRIVATE_CREDIT: CreditImpulseSpec = CreditImpulseSpec {
        first_span: 2,
        second_span: 2,
        scale: 100.0,
        smoothing: 6,
    };

    /// Quarterly mortgage credit: 6-month flow, its 9-month change, % of GDP, 4-period mean.
    pub const MORTGAGE_CREDIT: CreditImpulseSpec = CreditImpulseSpec {
        first_span: 2,
        second_span: 3,
        scale: 100.0,
        smoothing: 4,
    };
}

/// Unsmoothed credit impulse: `diff(diff(stock, first), second) / denominator · scale`.
pub fn credit_impulse_raw(
    stock: &[Option<f64>],
    denominator: &[Option<f64>],
    spec: &CreditImpulseSpec,
) -> Vec<Option<f64>> {
    let flow = diff(stock, spec.first_span);
    let acceleration = diff(&flow, spec.second_span);
    scale(&ratio(&acceleration, denominator), spec.scale)
}

/// Credit impulse smoothed over `spec.smoothing` periods.
pub fn credit_impulse(
    stock: &[Option<f64>],
    denominator: &[Option<f64>],
    spec: &CreditImpulseSpec,
) -> Vec<Option<f64>> {
    rolling_mean(&credit_impulse_raw(stock, denominator, spec), spec.smoothing)
}

/// Four-quarter change in a quarterly credit stock as a percent of the denominator.
pub fn credit_change_pct_gdp(stock: &[Option<f64>], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    scale(
        &ratio(&diff(stock, Frequency::Quarterly.periods_per_year()), denominator),
        100.0,
    )
}

/// Adds `"Credit Impulse/GDP"` and `"Credit Impulse Smoothed"` computed from
/// `stock` over `denominator`.
pub fn add_credit_impulse(
    table: &mut SeriesTable,
    stock: &str,
    denominator: &str,
    spec: &CreditImpulseSpec,
) -> Result<(), SeriesError> {
    let raw = credit_impulse_raw(table.require(stock)?, table.require(denominator)?, spec);
    let smoothed = rolling_mean(&raw, spec.smoothing);
    table.set_column("Credit Impulse/GDP", raw)?;
    table.set_column("Credit Impulse Smoothed", smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_credit_impulse_second_difference_fixture() {
        let stock = some(&[10.0, 12.0, 15.0, 19.0, 24.0, 30.0, 37.0]);
        let denominator = some(&[100.0; 7]);
        let spec = CreditImpulseSpec {
            first_span: 2,
            second_span: 2,
            scale: 1.0,
            smoothing: 1,
        };

        // diff(2): [_, _, 5, 7, 9, 11, 13]; diff(2) again: [_, _, _, _, 4, 4, 4]
        let raw = credit_impulse_raw(&stock, &denominator, &spec);
        assert_eq!(
            raw,
            vec![None, None, None, None, Some(0.04), Some(0.04), Some(0.04)]
        );
        assert_eq!(credit_impulse(&stock, &denominator, &spec), raw);
    }

    #[test]
    fn test_credit_impulse_spans_are_respected() {
        let stock = some(&[10.0, 12.0, 15.0, 19.0, 24.0, 30.0, 37.0]);
        let denominator = some(&[100.0; 7]);
        let spec = CreditImpulseSpec {
            first_span: 2,
            second_span: 3,
            scale: 1.0,
            smoothing: 1,
        };
        // diff(2): [_, _, 5, 7, 9, 11, 13]; diff(3): [_, _, _, _, _, 6, 6]
        let raw = credit_impulse_raw(&stock, &denominator, &spec);
        assert_eq!(raw[4], None);
        assert_eq!(raw[5], Some(0.06));
        assert_eq!(raw[6], Some(0.06));
    }

    #[test]
    fn test_smoothing_applies_trailing_mean() {
        let stock = some(&[0.0, 1.0, 3.0, 6.0, 10.0, 15.0]);
        let denominator = some(&[1.0; 6]);
        let spec = CreditImpulseSpec {
            first_span: 1,
            second_span: 1,
            scale: 1.0,
            smoothing: 2,
        };
        // flow [_, 1, 2, 3, 4, 5]; accel [_, _, 1, 1, 1, 1]
        let smoothed = credit_impulse(&stock, &denominator, &spec);
        assert_eq!(smoothed, vec![None, None, None, Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_add_yoy_uses_frequency_period_count() {
        let dates: Vec<NaiveDate> = (1..=13)
            .map(|m| {
                let (y, m) = if m > 12 { (2024, m - 12) } else { (2023, m) };
                crate::calendar::month_end(NaiveDate::from_ymd_opt(y, m, 1).unwrap())
            })
            .collect();
        let raw = dates
            .iter()
            .enumerate()
            .map(|(i, date)| (*date, Some(100.0 + i as f64)))
            .collect();
        let mut table = SeriesTable::from_raw("CPI", raw);
        add_yoy(&mut table, "CPI", "CPI YoY%", Frequency::Monthly).unwrap();

        let yoy = table.column("CPI YoY%").unwrap();
        assert!(yoy[..12].iter().all(Option::is_none));
        assert_eq!(yoy[12], Some((112.0 / 100.0 - 1.0) * 100.0));
    }

    #[test]
    fn test_credit_change_is_annual_difference_over_output() {
        let stock = some(&[100.0, 101.0, 102.0, 103.0, 110.0]);
        let gdp = some(&[50.0; 5]);
        let change = credit_change_pct_gdp(&stock, &gdp);
        assert!(change[..4].iter().all(Option::is_none));
        assert_eq!(change[4], Some(20.0));
    }

    #[test]
    fn test_private_credit_preset_matches_liquidity_report() {
        assert_eq!(CreditImpulseSpec::PRIVATE_CREDIT.first_span, 2);
        assert_eq!(CreditImpulseSpec::PRIVATE_CREDIT.second_span, 2);
        assert_eq!(CreditImpulseSpec::MORTGAGE_CREDIT.second_span, 3);
        assert_eq!(CreditImpulseSpec::MORTGAGE_CREDIT.smoothing, 4);
    }
}
