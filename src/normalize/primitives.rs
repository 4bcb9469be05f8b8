//! Element-wise primitives over nullable columns.
//!
//! Every function returns one output per input position. A missing input
//! anywhere in the computation yields a missing output; nothing is filled or
//! interpolated here.

/// Value `lag` positions earlier, `None` for the first `lag` positions.
pub fn shift(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).and_then(|j| values[j]))
        .collect()
}

/// `current - lagged` over a span of `span` positions.
pub fn diff(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .zip(shift(values, span))
        .map(|(current, lagged)| match (current, lagged) {
            (Some(c), Some(l)) => Some(c - l),
            _ => None,
        })
        .collect()
}

/// Fractional change `current / lagged - 1` over `periods` positions.
///
/// A zero base has no defined change and yields `None`.
pub fn pct_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .zip(shift(values, periods))
        .map(|(current, lagged)| match (current, lagged) {
            (Some(c), Some(l)) => change_ratio(*c, l),
            _ => None,
        })
        .collect()
}

/// Percent change over `periods` positions (fractional change × 100).
pub fn pct_change_percent(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    pct_change(values, periods)
        .into_iter()
        .map(|v| v.map(|r| r * 100.0))
        .collect()
}

/// Element-wise `numerator / denominator`; zero denominators yield `None`.
pub fn ratio(numerator: &[Option<f64>], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) if *d != 0.0 => Some(n / d),
            _ => None,
        })
        .collect()
}

/// Element-wise `left - right`.
pub fn difference(left: &[Option<f64>], right: &[Option<f64>]) -> Vec<Option<f64>> {
    left.iter()
        .zip(right)
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some(l - r),
            _ => None,
        })
        .collect()
}

/// Multiplies every present value by `factor`.
pub fn scale(values: &[Option<f64>], factor: f64) -> Vec<Option<f64>> {
    values.iter().map(|v| v.map(|x| x * factor)).collect()
}

fn change_ratio(current: f64, lagged: f64) -> Option<f64> {
    if lagged == 0.0 || lagged.is_nan() || current.is_nan() {
        return None;
    }
    Some(current / lagged - 1.0)
}
