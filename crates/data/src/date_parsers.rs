use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tickstream_core::DataError;

/// Turns the text of a date column into a UTC timestamp.
pub trait TextDateParser {
    fn parse(&self, text: &str) -> Result<DateTime<Utc>, DataError>;
}

impl<F> TextDateParser for F
where
    F: Fn(&str) -> Result<DateTime<Utc>, DataError>,
{
    fn parse(&self, text: &str) -> Result<DateTime<Utc>, DataError> {
        self(text)
    }
}

/// Stock date layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// `2024-01-31`
    DashedYearMonthDay,
    /// `2024/01/31`
    SlashedYearMonthDay,
    /// Any chrono format string. Date-only patterns resolve to midnight UTC.
    Pattern(String),
    /// RFC 3339, then common date-time layouts, then date-only layouts,
    /// then unix seconds.
    #[default]
    Auto,
}

impl DateFormat {
    pub fn pattern(format: impl Into<String>) -> Self {
        Self::Pattern(format.into())
    }
}

impl TextDateParser for DateFormat {
    fn parse(&self, text: &str) -> Result<DateTime<Utc>, DataError> {
        let text = text.trim();
        match self {
            Self::DashedYearMonthDay => parse_pattern(text, "%Y-%m-%d"),
            Self::SlashedYearMonthDay => parse_pattern(text, "%Y/%m/%d"),
            Self::Pattern(format) => parse_pattern(text, format),
            Self::Auto => parse_any(text),
        }
    }
}

impl std::str::FromStr for DateFormat {
    type Err = std::convert::Infallible;

    /// `auto`, `ymd`, `y/m/d`, or a chrono pattern.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "auto" => Self::Auto,
            "ymd" | "y-m-d" => Self::DashedYearMonthDay,
            "y/m/d" => Self::SlashedYearMonthDay,
            other => Self::Pattern(other.to_string()),
        })
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc)
}

fn parse_pattern(text: &str, format: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }
    NaiveDate::parse_from_str(text, format)
        .map(midnight)
        .map_err(|e| {
            DataError::ParseError(format!(
                "Unable to parse date '{}' with '{}': {}",
                text, format, e
            ))
        })
}

fn parse_any(s: &str) -> Result<DateTime<Utc>, DataError> {
    // Try RFC 3339 / ISO 8601 with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Common formats (without timezone, assume UTC)
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y%m%d %H:%M:%S",
        "%Y.%m.%d %H:%M",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(midnight(date));
        }
    }

    // Try Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!(
        "Unable to parse timestamp: '{}'",
        s
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_dashed_and_slashed() {
        let dashed = DateFormat::DashedYearMonthDay.parse("2024-03-15").unwrap();
        let slashed = DateFormat::SlashedYearMonthDay.parse("2024/03/15").unwrap();
        assert_eq!(dashed, slashed);
        assert_eq!((dashed.year(), dashed.month(), dashed.day()), (2024, 3, 15));
        assert_eq!(dashed.hour(), 0);
    }

    #[test]
    fn test_wrong_layout_is_parse_error() {
        let err = DateFormat::DashedYearMonthDay.parse("15/03/2024").unwrap_err();
        assert!(matches!(err, DataError::ParseError(_)));
    }

    #[test]
    fn test_pattern_with_time() {
        let dt = DateFormat::pattern("%d.%m.%Y %H:%M")
            .parse("15.03.2024 09:30")
            .unwrap();
        assert_eq!((dt.day(), dt.hour(), dt.minute()), (15, 9, 30));
    }

    #[test]
    fn test_auto_formats() {
        let auto = DateFormat::Auto;
        let expected = DateFormat::DashedYearMonthDay.parse("2024-03-15").unwrap();
        assert_eq!(auto.parse("2024-03-15").unwrap(), expected);
        assert_eq!(auto.parse("20240315").unwrap(), expected);
        assert_eq!(auto.parse("2024-03-15T00:00:00Z").unwrap(), expected);
        assert_eq!(auto.parse(&expected.timestamp().to_string()).unwrap(), expected);
        assert!(auto.parse("yesterday").is_err());
    }

    #[test]
    fn test_closure_parser() {
        let fixed = |_: &str| -> Result<DateTime<Utc>, DataError> { Ok(DateTime::UNIX_EPOCH) };
        assert_eq!(fixed.parse("anything").unwrap(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_from_str_names() {
        assert_eq!("auto".parse::<DateFormat>().unwrap(), DateFormat::Auto);
        assert_eq!("ymd".parse::<DateFormat>().unwrap(), DateFormat::DashedYearMonthDay);
        assert_eq!(
            "%d-%m-%Y".parse::<DateFormat>().unwrap(),
            DateFormat::Pattern("%d-%m-%Y".into())
        );
    }
}
