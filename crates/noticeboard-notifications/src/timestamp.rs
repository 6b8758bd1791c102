//! ISO-8601 timestamp parsing and formatting.
//!
//! Inputs may carry an explicit offset (`2020-11-16T20:08:39.128358+02:00`,
//! `...Z`) or none at all (`2020-11-16T20:08:39.128358`), in which case they
//! are taken to be UTC. Fractional seconds are optional. Output is always
//! RFC 3339 in UTC with only as many fractional digits as needed, so a
//! formatted value parses back to the same instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// Offset-less layouts accepted in addition to RFC 3339.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Offset layout without the colon RFC 3339 requires, e.g. `+0200`.
const COMPACT_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Error returned for input that matches none of the accepted layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised timestamp: '{0}'")]
pub struct TimestampError(pub String);

/// Parses an ISO-8601 timestamp into a UTC instant.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, COMPACT_OFFSET_FORMAT) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(TimestampError(input.to_string()))
}

/// Formats a UTC instant as RFC 3339 with a `Z` suffix.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};

    #[test]
    fn parses_naive_timestamp_with_fraction_as_utc() {
        let parsed = parse_timestamp("2020-11-16T20:08:39.128358").unwrap();
        let expected = Utc.with_ymd_and_hms(2020, 11, 16, 20, 8, 39).unwrap()
            + Duration::microseconds(128_358);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parses_naive_timestamp_without_fraction() {
        let parsed = parse_timestamp("2020-10-10T10:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 10, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn parses_space_separated_timestamp() {
        let parsed = parse_timestamp("2020-10-10 10:00:00.5").unwrap();
        assert_eq!(parsed.nanosecond(), 500_000_000);
    }

    #[test]
    fn normalises_offsets_to_utc() {
        let parsed = parse_timestamp("2020-10-10T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 10, 10, 10, 0, 0).unwrap());

        let compact = parse_timestamp("2020-10-10T12:00:00+0200").unwrap();
        assert_eq!(compact, parsed);

        let zulu = parse_timestamp("2020-10-10T10:00:00Z").unwrap();
        assert_eq!(zulu, parsed);
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let parsed = parse_timestamp("2020-10-10").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 10, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        for input in ["foo", "", "2020-13-01T00:00:00", "2020-11-16T25:00:00", "yesterday"] {
            assert!(parse_timestamp(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn formatted_timestamps_parse_back_to_the_same_instant() {
        let instants = [
            Utc.with_ymd_and_hms(2020, 11, 16, 20, 8, 39).unwrap(),
            Utc.with_ymd_and_hms(2020, 11, 16, 20, 8, 39).unwrap() + Duration::microseconds(128_358),
            Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap() + Duration::nanoseconds(1),
        ];
        for at in instants {
            let text = format_timestamp(&at);
            assert!(text.ends_with('Z'), "{text} should be in UTC");
            assert_eq!(parse_timestamp(&text).unwrap(), at);
        }
    }

    #[test]
    fn format_drops_zero_fraction() {
        let at = Utc.with_ymd_and_hms(2020, 10, 10, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&at), "2020-10-10T10:00:00Z");
    }
}
