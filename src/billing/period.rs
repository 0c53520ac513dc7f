use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::timestamp;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("period `{value}` must be a calendar month in YYYY-MM format")]
pub struct PeriodError {
    pub value: String,
}

/// key: billing-period -> calendar month invoicing window
///
/// Covers the half-open range `[start, end)` from the first instant of the month to the first
/// instant of the following month, both in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
    start: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        let err = || PeriodError {
            value: format!("{year:04}-{month:02}"),
        };
        if !(1..=9998).contains(&year) {
            return Err(err());
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(err)?;
        Ok(Self {
            year,
            month,
            start: Utc.from_utc_datetime(&first),
        })
    }

    pub fn parse(value: &str) -> Result<Self, PeriodError> {
        let err = || PeriodError {
            value: value.to_string(),
        };
        let bytes = value.as_bytes();
        let shape_ok = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !shape_ok {
            return Err(err());
        }
        let year: i32 = value[..4].parse().map_err(|_| err())?;
        let month: u32 = value[5..].parse().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }

    /// The period that contains `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let first = NaiveDate::from_ymd_opt(instant.year(), instant.month(), 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(instant);
        Self {
            year: instant.year(),
            month: instant.month(),
            start: first,
        }
    }

    /// The month immediately before this one.
    pub fn previous(&self) -> Self {
        let start = self
            .start
            .checked_sub_months(Months::new(1))
            .unwrap_or(self.start);
        Self {
            year: start.year(),
            month: start.month(),
            start,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_months(Months::new(1))
            .unwrap_or(self.start)
    }

    pub fn start_canonical(&self) -> String {
        timestamp::canonical(&self.start())
    }

    pub fn end_canonical(&self) -> String {
        timestamp::canonical(&self.end())
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_are_half_open() {
        let period = BillingPeriod::parse("2024-01").unwrap();
        assert_eq!(period.start_canonical(), "2024-01-01T00:00:00.000000Z");
        assert_eq!(period.end_canonical(), "2024-02-01T00:00:00.000000Z");
    }

    #[test]
    fn december_rolls_into_next_year() {
        let period = BillingPeriod::parse("2023-12").unwrap();
        assert_eq!(period.end_canonical(), "2024-01-01T00:00:00.000000Z");
    }

    #[test]
    fn february_of_leap_year() {
        let period = BillingPeriod::parse("2024-02").unwrap();
        assert_eq!(period.end_canonical(), "2024-03-01T00:00:00.000000Z");
    }

    #[test]
    fn malformed_periods_are_rejected() {
        for value in ["", "2024", "2024-1", "2024-13", "2024-00", "24-01", "2024/01", "2024-01-01", "abcd-ef"] {
            assert!(BillingPeriod::parse(value).is_err(), "expected `{value}` to be rejected");
        }
    }

    #[test]
    fn previous_crosses_year_boundary() {
        let january = BillingPeriod::parse("2024-01").unwrap();
        assert_eq!(january.previous().to_string(), "2023-12");
        let march = BillingPeriod::parse("2024-03").unwrap();
        assert_eq!(march.previous().to_string(), "2024-02");
    }

    #[test]
    fn containing_picks_the_calendar_month() {
        let instant = Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap();
        assert_eq!(BillingPeriod::containing(instant).to_string(), "2024-02");
    }
}
