//! Turning raw provider series into report-ready tables.
//!
//! Everything here is a pure function over values or [`SeriesTable`]s;
//! no module in `normalize` performs I/O.
//!
//! [`SeriesTable`]: crate::series::SeriesTable

pub mod derived;
pub mod interpolate;
pub mod primitives;
pub mod projection;
pub mod resample;
pub mod windows;

pub use derived::{
    add_credit_impulse, add_difference, add_ratio, add_rolling_mean, add_yoy, credit_change_pct_gdp,
    credit_impulse, credit_impulse_raw, yoy_percent, CreditImpulseSpec,
};
pub use interpolate::upsample_cubic;
pub use primitives::{diff, difference, pct_change, pct_change_percent, ratio, scale, shift};
pub use projection::{extend_with_proxy, project_forward};
pub use resample::{resample, Aggregation};
pub use windows::{rolling_mean, TrailingWindow};
