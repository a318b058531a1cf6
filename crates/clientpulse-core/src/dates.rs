//! Reporting-period arithmetic.
//!
//! Every function here is pure: the caller supplies the reference date, and
//! nothing reads the clock except [`current_period_today`].

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format used on the wire and in chart series.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("date range start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("invalid date \"{value}\": expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("unknown report granularity \"{0}\": expected monthly or weekly")]
    UnknownGranularity(String),
}

/// An inclusive calendar-date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DateRangeError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`DateRangeError::Inverted`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings into a range.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::InvalidDate`] for malformed input and
    /// [`DateRangeError::Inverted`] if `start` is after `end`.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        Self::new(parse_iso_date(start)?, parse_iso_date(end)?)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both bounds.
    #[must_use]
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    #[must_use]
    pub fn start_iso(&self) -> String {
        self.start.format(ISO_DATE_FORMAT).to_string()
    }

    #[must_use]
    pub fn end_iso(&self) -> String {
        self.end.format(ISO_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_iso(), self.end_iso())
    }
}

/// Parses a `YYYY-MM-DD` string.
///
/// # Errors
///
/// Returns [`DateRangeError::InvalidDate`] if the string is not a valid date.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).map_err(|_| DateRangeError::InvalidDate {
        value: value.to_string(),
    })
}

/// How often a client's report is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Weekly,
}

impl FromStr for Granularity {
    type Err = DateRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            other => Err(DateRangeError::UnknownGranularity(other.to_string())),
        }
    }
}

/// The most recent fully completed period before `reference`.
///
/// Monthly returns the previous calendar month; weekly returns the previous
/// Monday to Sunday week.
#[must_use]
pub fn current_period(granularity: Granularity, reference: NaiveDate) -> DateRange {
    match granularity {
        Granularity::Monthly => {
            let first_of_month = first_day_of_month(reference);
            let end = first_of_month - Duration::days(1);
            DateRange {
                start: first_day_of_month(end),
                end,
            }
        }
        Granularity::Weekly => {
            let since_monday = i64::from(reference.weekday().num_days_from_monday());
            let this_monday = reference - Duration::days(since_monday);
            DateRange {
                start: this_monday - Duration::days(7),
                end: this_monday - Duration::days(1),
            }
        }
    }
}

/// [`current_period`] relative to today's UTC date.
#[must_use]
pub fn current_period_today(granularity: Granularity) -> DateRange {
    current_period(granularity, Utc::now().date_naive())
}

/// The range of identical length ending the day before `range` starts.
#[must_use]
pub fn previous_period(range: &DateRange) -> DateRange {
    let end = range.start - Duration::days(1);
    let start = end - Duration::days(range.day_count() - 1);
    DateRange { start, end }
}

/// One `YYYY-MM-DD` entry per day in `range`, both bounds included.
#[must_use]
pub fn days_in_range(range: &DateRange) -> Vec<String> {
    range
        .start
        .iter_days()
        .take_while(|day| *day <= range.end)
        .map(|day| day.format(ISO_DATE_FORMAT).to_string())
        .collect()
}

/// Percentage change from `previous` to `current`, rounded to one decimal.
///
/// Returns `0.0` when `previous` is zero.
#[must_use]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let change = (current - previous) / previous.abs() * 100.0;
    (change * 10.0).round() / 10.0
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
#[must_use]
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Human label for a period: `"January 2026"` for an exact calendar month,
/// otherwise `"Jan 5 – Jan 11, 2026"` (both years shown across a year boundary).
#[must_use]
pub fn format_period_label(range: &DateRange) -> String {
    if is_whole_month(range) {
        return range.start.format("%B %Y").to_string();
    }

    if range.start.year() == range.end.year() {
        format!(
            "{} \u{2013} {}",
            range.start.format("%b %-d"),
            range.end.format("%b %-d, %Y")
        )
    } else {
        format!(
            "{} \u{2013} {}",
            range.start.format("%b %-d, %Y"),
            range.end.format("%b %-d, %Y")
        )
    }
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).map_or(date, |next| next - Duration::days(1))
}

fn is_whole_month(range: &DateRange) -> bool {
    range.start.day() == 1 && range.end == last_day_of_month(range.start)
}
