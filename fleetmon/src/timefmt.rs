//! Minute-resolution calendar time conversion.
//!
//! Query requests and log tooling carry wall-clock timestamps in
//! `"YYYY-MM-DD HH:MM"` form; the store works in epoch seconds. Both
//! directions interpret the textual form as UTC, and for any timestamp on a
//! minute boundary the two functions are exact inverses.

use chrono::{DateTime, NaiveDateTime};

use crate::error::ParseError;

/// Textual timestamp format carried by the query protocol and log tooling.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses `"YYYY-MM-DD HH:MM"` (UTC) into seconds since the Unix epoch.
///
/// Only minute resolution is carried; there is no seconds field.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDateTime`] if the input does not match the
/// format or names an impossible calendar date.
pub fn parse_datetime(s: &str) -> Result<i64, ParseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| ParseError::InvalidDateTime {
            input: s.to_string(),
        })
}

/// Formats seconds since the Unix epoch as `"YYYY-MM-DD HH:MM"` (UTC).
///
/// Seconds past the minute are truncated, so this is the exact inverse of
/// [`parse_datetime`] for any timestamp that is a multiple of 60.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTimestamp`] if the timestamp is outside the
/// representable calendar range.
pub fn format_datetime(ts: i64) -> Result<String, ParseError> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .ok_or(ParseError::InvalidTimestamp {
            input: ts.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2014-10-31 00:00:00 UTC
    const T0: i64 = 1_414_713_600;

    #[test]
    fn parses_known_instant() {
        assert_eq!(parse_datetime("2014-10-31 00:00").unwrap(), T0);
        assert_eq!(parse_datetime("2014-10-31 00:01").unwrap(), T0 + 60);
        assert_eq!(parse_datetime("2014-11-01 00:00").unwrap(), T0 + 86_400);
        assert_eq!(parse_datetime("1970-01-01 00:00").unwrap(), 0);
    }

    #[test]
    fn formats_known_instant() {
        assert_eq!(format_datetime(T0).unwrap(), "2014-10-31 00:00");
        assert_eq!(format_datetime(0).unwrap(), "1970-01-01 00:00");
    }

    #[test]
    fn seconds_are_truncated() {
        assert_eq!(format_datetime(T0 + 59).unwrap(), "2014-10-31 00:00");
        assert_eq!(format_datetime(T0 + 60).unwrap(), "2014-10-31 00:01");
    }

    #[test]
    fn round_trips_on_minute_boundaries() {
        for ts in [0, T0, T0 + 60, T0 + 86_400, 4_102_444_800 /* 2100 */] {
            let text = format_datetime(ts).unwrap();
            assert_eq!(parse_datetime(&text).unwrap(), ts);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for text in [
            "",
            "garbage",
            "2014-10-31",
            "00:00 2014-10-31",
            "2014-10-31 00:00:00",
            "2014-10-31T00:00",
            "2014-13-01 00:00",
            "2014-02-30 00:00",
            "2014-10-31 24:00",
        ] {
            assert!(
                matches!(
                    parse_datetime(text),
                    Err(ParseError::InvalidDateTime { .. })
                ),
                "expected '{text}' to be rejected"
            );
        }
    }
}
