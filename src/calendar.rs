//! Canonical period boundaries.
//!
//! Every stored table is keyed by the *end* of its observation period: the
//! week-ending day, the last day of the month, quarter or year. Providers
//! publish with their own conventions (FRED dates monthly series on the 1st,
//! SDMX labels quarters as `2024-Q3`), so connectors map raw dates through
//! the helpers here before anything is joined or stored.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Sampling frequency of a series table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Business-daily observations, no boundary alignment.
    Daily,
    /// Weeks ending on Friday (market data).
    WeeklyFriday,
    /// Weeks ending on Sunday.
    WeeklySunday,
    /// Month-end.
    Monthly,
    /// Quarter-end.
    Quarterly,
    /// Year-end.
    Annual,
}

impl Frequency {
    /// Number of periods spanning one year, used for year-over-year changes.
    pub fn periods_per_year(self) -> usize {
        match self {
            // trading days
            Frequency::Daily => 252,
            Frequency::WeeklyFriday | Frequency::WeeklySunday => 52,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Annual => 1,
        }
    }

    /// Returns the boundary of the period containing `date`.
    ///
    /// Dates already on a boundary map to themselves.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::WeeklyFriday => week_ending(date, Weekday::Fri),
            Frequency::WeeklySunday => week_ending(date, Weekday::Sun),
            Frequency::Monthly => month_end(date),
            Frequency::Quarterly => quarter_end(date),
            Frequency::Annual => year_end(date),
        }
    }

    /// Returns the boundary immediately after `boundary`.
    pub fn next_period_end(self, boundary: NaiveDate) -> NaiveDate {
        let next_day = boundary.succ_opt().unwrap_or(boundary);
        self.period_end(next_day)
    }
}

/// Rolls `date` forward to the next `weekday` (or keeps it if it already is one).
pub fn week_ending(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = date.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let offset = (target - current).rem_euclid(7);
    date + Duration::days(offset)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    last_day_of(date.year(), date.month()).unwrap_or(date)
}

/// Last day of the calendar quarter containing `date`.
pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    let quarter_month = ((date.month() - 1) / 3 + 1) * 3;
    last_day_of(date.year(), quarter_month).unwrap_or(date)
}

/// December 31st of the year containing `date`.
pub fn year_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}

/// Returns true when `date` is the last day of its month.
pub fn is_month_end(date: NaiveDate) -> bool {
    month_end(date) == date
}

/// Moves `date` by `n` month-ends.
///
/// A date that is not itself a month-end counts rolling forward to the end
/// of its own month as the first step, so `shift_month_ends(Jan 15, 1)` is
/// Jan 31 while `shift_month_ends(Jan 31, 1)` is Feb 29/28. `n == 0` only
/// rolls forward. Negative `n` moves back to earlier month-ends.
pub fn shift_month_ends(date: NaiveDate, n: i32) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    let months = if n > 0 && !is_month_end(date) { n - 1 } else { n };

    let shifted = if months >= 0 {
        first.checked_add_months(Months::new(months as u32))
    } else {
        first.checked_sub_months(Months::new(months.unsigned_abs()))
    };

    shifted.map(month_end).unwrap_or(date)
}

/// Parses an SDMX quarter label (`2024-Q3`, `2024Q3`) into its quarter-end date.
pub fn parse_quarter_label(label: &str) -> Option<NaiveDate> {
    let trimmed = label.trim();
    let (year, quarter) = trimmed.split_once('Q')?;
    let year: i32 = year.trim_end_matches('-').trim().parse().ok()?;
    let quarter: u32 = quarter.trim().parse().ok()?;
    if !(1..=4).contains(&quarter) {
        return None;
    }
    last_day_of(year, quarter * 3)
}

fn last_day_of(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    next.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_end_handles_leap_years() {
        assert_eq!(month_end(d(2024, 2, 1)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 14)), d(2023, 2, 28));
        assert_eq!(month_end(d(2023, 12, 31)), d(2023, 12, 31));
    }

    #[test]
    fn test_quarter_and_year_end() {
        assert_eq!(quarter_end(d(2024, 1, 1)), d(2024, 3, 31));
        assert_eq!(quarter_end(d(2024, 5, 17)), d(2024, 6, 30));
        assert_eq!(quarter_end(d(2024, 12, 31)), d(2024, 12, 31));
        assert_eq!(year_end(d(2024, 7, 4)), d(2024, 12, 31));
    }

    #[test]
    fn test_week_ending_rolls_forward() {
        // 2024-01-10 is a Wednesday
        assert_eq!(week_ending(d(2024, 1, 10), Weekday::Fri), d(2024, 1, 12));
        assert_eq!(week_ending(d(2024, 1, 12), Weekday::Fri), d(2024, 1, 12));
        assert_eq!(week_ending(d(2024, 1, 13), Weekday::Fri), d(2024, 1, 19));
        assert_eq!(week_ending(d(2024, 1, 10), Weekday::Sun), d(2024, 1, 14));
    }

    #[test]
    fn test_next_period_end_advances_one_period() {
        assert_eq!(Frequency::Monthly.next_period_end(d(2024, 1, 31)), d(2024, 2, 29));
        assert_eq!(Frequency::WeeklyFriday.next_period_end(d(2024, 1, 12)), d(2024, 1, 19));
        assert_eq!(Frequency::Quarterly.next_period_end(d(2024, 3, 31)), d(2024, 6, 30));
    }

    #[test]
    fn test_shift_month_ends_matches_offset_semantics() {
        assert_eq!(shift_month_ends(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(shift_month_ends(d(2024, 1, 31), 6), d(2024, 7, 31));
        assert_eq!(shift_month_ends(d(2024, 1, 15), 1), d(2024, 1, 31));
        assert_eq!(shift_month_ends(d(2024, 1, 15), 0), d(2024, 1, 31));
        assert_eq!(shift_month_ends(d(2024, 3, 31), -1), d(2024, 2, 29));
        assert_eq!(shift_month_ends(d(2024, 11, 30), 3), d(2025, 2, 28));
    }

    #[test]
    fn test_parses_quarter_labels() {
        assert_eq!(parse_quarter_label("2024-Q3"), Some(d(2024, 9, 30)));
        assert_eq!(parse_quarter_label("1999Q1"), Some(d(1999, 3, 31)));
        assert_eq!(parse_quarter_label("2024-Q5"), None);
        assert_eq!(parse_quarter_label("2024-03"), None);
    }

    #[test]
    fn test_periods_per_year_follow_frequency() {
        assert_eq!(Frequency::Monthly.periods_per_year(), 12);
        assert_eq!(Frequency::WeeklyFriday.periods_per_year(), 52);
        assert_eq!(Frequency::Quarterly.periods_per_year(), 4);
    }
}
