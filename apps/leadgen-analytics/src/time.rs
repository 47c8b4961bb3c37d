use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

pub(crate) const DAY_SECONDS: i64 = 24 * 60 * 60;

/// ISO-8601 week identifier (Monday-start, week 1 holds the year's first Thursday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl IsoWeekKey {
    /// Parses a `YYYY-Www` key back into its numeric parts.
    pub fn parse(key: &str) -> Option<Self> {
        let (year, week) = key.split_once("-W")?;
        Some(Self {
            year: year.trim().parse().ok()?,
            week: week.trim().parse().ok()?,
        })
    }
}

/// Parses a `DD/MM/YYYY` date.
///
/// Each part must be a non-zero integer. Day and month values past the end of
/// their range roll forward into the following month/year, and two-digit
/// years map onto 19xx. Anything else returns `None`.
pub fn parse_dd_mm_yyyy(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let day = parse_part(parts.next()?)?;
    let month = parse_part(parts.next()?)?;
    let year = parse_part(parts.next()?)?;

    let year = if (0..100).contains(&year) {
        1900 + year
    } else {
        year
    };
    let months_from_year_start = month - 1;
    let year = year.checked_add(months_from_year_start.div_euclid(12))?;
    let month0 = months_from_year_start.rem_euclid(12);

    let first_of_month =
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, (month0 + 1) as u32, 1)?;
    first_of_month.checked_add_signed(Duration::days(day - 1))
}

fn parse_part(part: &str) -> Option<i64> {
    let value = part.trim().parse::<i64>().ok()?;
    if value <= 0 || value > 1_000_000 {
        return None;
    }
    Some(value)
}

/// Thursday-anchored ISO week: shift to the Thursday of the date's week and
/// count weeks from January 1 of that Thursday's year.
///
/// `None` when that Thursday falls outside chrono's date range.
pub fn iso_week(date: NaiveDate) -> Option<IsoWeekKey> {
    let weekday = i64::from(date.weekday().number_from_monday());
    let thursday = date.checked_add_signed(Duration::days(4 - weekday))?;
    let year = thursday.year();
    let week = thursday.ordinal0() / 7 + 1;
    Some(IsoWeekKey { year, week })
}

/// `YYYY-MM`, zero padded so lexicographic order is chronological.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// `YYYY-MM-DD`.
pub fn iso_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_seconds() as f64 / DAY_SECONDS as f64
}
