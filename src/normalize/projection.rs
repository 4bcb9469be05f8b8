//! Extending a discontinued price feed with a proxy instrument's returns.
//!
//! The spot-gold workbook stops at its publication date; the pipeline keeps
//! the series current by compounding the weekly returns of a gold ETF onto
//! the last published spot price.

use crate::error::SeriesError;
use crate::normalize::primitives::pct_change;
use crate::series::SeriesTable;

/// Compounds `returns` onto `start`, one step per return, in order.
///
/// Step `k` equals `start · ∏(1 + rᵢ)` for `i = 1..=k`. A missing return
/// carries the previous price forward unchanged.
pub fn project_forward(start: f64, returns: &[Option<f64>]) -> Vec<f64> {
    returns
        .iter()
        .fold(Vec::with_capacity(returns.len()), |mut path, step| {
            let previous = path.last().copied().unwrap_or(start);
            let next = match step {
                Some(r) => previous * (1.0 + r),
                None => previous,
            };
            path.push(next);
            path
        })
}

/// Extends column `spot_column` of `spot` past its last date using the
/// period-over-period returns of `proxy_column` in `proxy`.
///
/// Both tables must share period boundaries. Proxy periods on or before the
/// last spot date are ignored; spot rows are never rewritten.
pub fn extend_with_proxy(
    spot: &SeriesTable,
    spot_column: &str,
    proxy: &SeriesTable,
    proxy_column: &str,
) -> Result<SeriesTable, SeriesError> {
    let spot_values = spot.require(spot_column)?;
    let proxy_values = proxy.require(proxy_column)?;

    let Some(last_spot_date) = spot.last_date() else {
        return Ok(spot.clone());
    };
    let Some(last_price) = spot_values.iter().rev().find_map(|v| *v) else {
        return Ok(spot.clone());
    };

    let returns = pct_change(proxy_values, 1);
    let (dates, steps): (Vec<_>, Vec<_>) = proxy
        .index()
        .iter()
        .zip(returns)
        .filter(|(date, _)| **date > last_spot_date)
        .map(|(date, r)| (*date, r))
        .unzip();

    if dates.is_empty() {
        return Ok(spot.clone());
    }

    let projected = project_forward(last_price, &steps);
    let tail = SeriesTable::from_rows(
        vec![spot_column.to_string()],
        dates
            .into_iter()
            .zip(projected)
            .map(|(date, price)| (date, vec![Some(price)]))
            .collect(),
    );

    Ok(spot.concat(&tail))
}
