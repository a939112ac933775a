//! Acquisition timestamp parsing and the three x-axis key formats.
//!
//! Every plotted point carries three string keys derived from its acquired
//! time: `fullDate` (date + time), `date` (date only), and `groupedXTick`
//! (date only, optionally extended with guide-set range info). Date-union and
//! gap-fill logic compares the formatted strings, which sort
//! chronologically because both formats are big-endian.

use chrono::NaiveDateTime;

use crate::error::{QcTrendError, Result};

pub const FULL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a timestamp as emitted by the query layer.
///
/// The remote endpoint is not consistent about formats: rows produced by the
/// JSON API carry ISO 8601 with a `T` separator, while SQL passthrough rows
/// use a space separator and may omit seconds or the time entirely.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    // date-only values resolve to midnight
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, DATE_FORMAT) {
        if let Some(parsed) = date.and_hms_opt(0, 0, 0) {
            return Ok(parsed);
        }
    }
    Err(QcTrendError::InvalidDate(value.to_string()))
}

/// Date + time key (`fullDate`).
pub fn format_full_date(value: &NaiveDateTime) -> String {
    value.format(FULL_DATE_FORMAT).to_string()
}

/// Date-only key (`date` and the base of `groupedXTick`).
pub fn format_date(value: &NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Key used when unioning dates across fragments: the full key unless the
/// x-axis groups runs by date.
pub fn format_axis_key(value: &NaiveDateTime, grouped_x: bool) -> String {
    if grouped_x {
        format_date(value)
    } else {
        format_full_date(value)
    }
}

/// Serde adapter for optional timestamps in payload rows.
pub mod optional_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{FULL_DATE_FORMAT, parse_datetime};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.is_empty() => Ok(None),
            Some(value) => parse_datetime(&value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            None => serializer.serialize_none(),
            Some(value) => serializer.serialize_str(&value.format(FULL_DATE_FORMAT).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_and_sql_timestamps() {
        let a = parse_datetime("2024-03-01T10:30:00").unwrap();
        let b = parse_datetime("2024-03-01 10:30:00").unwrap();
        let c = parse_datetime("2024-03-01 10:30").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let parsed = parse_datetime("2024-03-01").unwrap();
        assert_eq!(format_full_date(&parsed), "2024-03-01 00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn axis_keys_sort_chronologically() {
        let early = parse_datetime("2024-03-01 08:00").unwrap();
        let late = parse_datetime("2024-03-01 17:45").unwrap();
        assert!(format_full_date(&early) < format_full_date(&late));
        assert_eq!(format_date(&early), format_date(&late));
    }
}
