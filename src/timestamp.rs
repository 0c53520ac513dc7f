//! Strict ISO-8601 parsing and the canonical string form used for every stored timestamp.
//!
//! Stored timestamps are UTC, fixed width and microsecond precision, so comparing the
//! strings lexically gives the same answer as comparing the instants.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("`{value}` is not a valid ISO-8601 timestamp")]
    Invalid { value: String },
    #[error("`{value}` falls outside the supported years 0000-9999")]
    OutOfRange { value: String },
}

/// Parses `YYYY-MM-DD[(T| )HH:MM[:SS[.fraction]][Z|±HH:MM]]`. Inputs without an offset are UTC.
pub fn parse_iso8601(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let invalid = || TimestampError::Invalid {
        value: input.to_string(),
    };

    if !input.is_ascii() || input.len() < 10 {
        return Err(invalid());
    }
    let (date_part, rest) = input.split_at(10);
    let date = parse_date(date_part).ok_or_else(invalid)?;

    if rest.is_empty() {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return in_range(Utc.from_utc_datetime(&naive), input);
    }

    let mut chars = rest.chars();
    if !matches!(chars.next(), Some('T') | Some(' ')) {
        return Err(invalid());
    }
    let rest = chars.as_str();

    let (time_part, offset) = split_offset(rest).ok_or_else(invalid)?;
    let time = parse_time(time_part).ok_or_else(invalid)?;
    let naive = NaiveDateTime::new(date, time);

    let utc = match offset {
        None => Utc.from_utc_datetime(&naive),
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(invalid)?
            .with_timezone(&Utc),
    };
    in_range(utc, input)
}

/// Renders an instant in the canonical stored form.
pub fn canonical(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

/// Parses and re-serializes a client supplied timestamp.
pub fn normalize(input: &str) -> Result<String, TimestampError> {
    parse_iso8601(input).map(|instant| canonical(&instant))
}

pub fn now_canonical() -> String {
    canonical(&Utc::now())
}

fn in_range(instant: DateTime<Utc>, input: &str) -> Result<DateTime<Utc>, TimestampError> {
    if (0..=9999).contains(&instant.year()) {
        Ok(instant)
    } else {
        Err(TimestampError::OutOfRange {
            value: input.to_string(),
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.iter().enumerate().all(|(idx, byte)| match idx {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let bytes = value.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    match bytes.len() {
        5 if bytes[2] == b':' && digits(0..2) && digits(3..5) => {
            NaiveTime::parse_from_str(value, "%H:%M").ok()
        }
        8 if bytes[2] == b':' && bytes[5] == b':' && digits(0..2) && digits(3..5) && digits(6..8) => {
            NaiveTime::parse_from_str(value, "%H:%M:%S").ok()
        }
        len if (10..=18).contains(&len)
            && bytes[2] == b':'
            && bytes[5] == b':'
            && bytes[8] == b'.'
            && digits(0..2)
            && digits(3..5)
            && digits(6..8)
            && digits(9..len) =>
        {
            NaiveTime::parse_from_str(value, "%H:%M:%S%.f").ok()
        }
        _ => None,
    }
}

/// Splits a trailing `Z` or `±HH:MM` designator off the time portion.
fn split_offset(value: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(time) = value.strip_suffix('Z') {
        return Some((time, FixedOffset::east_opt(0)));
    }
    let Some(idx) = value.rfind(['+', '-']) else {
        return Some((value, None));
    };
    let (time, designator) = value.split_at(idx);
    let bytes = designator.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return None;
    }
    let hours: i32 = designator[1..3].parse().ok()?;
    let minutes: i32 = designator[4..6].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    let offset = if bytes[0] == b'-' {
        FixedOffset::west_opt(seconds)?
    } else {
        FixedOffset::east_opt(seconds)?
    };
    Some((time, Some(offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_is_midnight_utc() {
        assert_eq!(
            normalize("2024-01-05").unwrap(),
            "2024-01-05T00:00:00.000000Z"
        );
    }

    #[test]
    fn naive_times_are_treated_as_utc() {
        assert_eq!(
            normalize("2024-01-05T10:30").unwrap(),
            "2024-01-05T10:30:00.000000Z"
        );
        assert_eq!(
            normalize("2024-01-05 10:30:15").unwrap(),
            "2024-01-05T10:30:15.000000Z"
        );
        assert_eq!(
            normalize("2024-01-05T10:30:15.25").unwrap(),
            "2024-01-05T10:30:15.250000Z"
        );
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        assert_eq!(
            normalize("2024-01-05T10:00:00+02:00").unwrap(),
            "2024-01-05T08:00:00.000000Z"
        );
        assert_eq!(
            normalize("2023-12-31T23:30:00-01:00").unwrap(),
            "2024-01-01T00:30:00.000000Z"
        );
        assert_eq!(
            normalize("2024-01-05T10:00:00Z").unwrap(),
            "2024-01-05T10:00:00.000000Z"
        );
    }

    #[test]
    fn lexical_order_matches_chronological_order() {
        let earlier = normalize("2024-01-05T10:00:00+05:00").unwrap();
        let later = normalize("2024-01-05T06:00:00").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        for value in [
            "",
            "yesterday",
            "2024-1-05",
            "2024-13-01",
            "2024-02-30",
            "2024-01-05T",
            "2024-01-05T25:00",
            "2024-01-05T10:00:00+2",
            "2024-01-05X10:00",
            "2024-01-05T10:00:00.",
            " 2024-01-05",
        ] {
            assert!(
                matches!(parse_iso8601(value), Err(TimestampError::Invalid { .. })),
                "expected `{value}` to be rejected"
            );
        }
    }

    #[test]
    fn offsets_past_year_9999_are_out_of_range() {
        assert!(matches!(
            parse_iso8601("9999-12-31T23:30:00-01:00"),
            Err(TimestampError::OutOfRange { .. })
        ));
    }
}
