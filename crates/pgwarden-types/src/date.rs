//! Timestamp interpretation and formatting.
//!
//! Inputs without an offset are wall-clock times in the target zone (the
//! supplied IANA zone, or the process-local zone). Inputs with an offset are
//! converted into it.

use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;
use crate::value::ParamValue;

/// Output format: `YYYY-MM-DD HH:mm:ss ZZ`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f%z"];

enum Moment {
    Fixed(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Format `value` as a timestamp string, or `None` for null input.
pub fn format(
    value: &ParamValue,
    timezone: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let moment = match interpret(value)? {
        Some(moment) => moment,
        None => return Ok(None),
    };

    let rendered = match timezone {
        Some(name) => {
            let tz: Tz = name
                .parse()
                .map_err(|_| ValidationError::UnknownTimezone(name.to_string()))?;
            render_in(&tz, moment, value)?
        }
        None => render_in(&Local, moment, value)?,
    };

    Ok(Some(rendered))
}

fn render_in<Z>(
    zone: &Z,
    moment: Moment,
    original: &ParamValue,
) -> Result<String, ValidationError>
where
    Z: TimeZone,
    Z::Offset: Display,
{
    let zoned = match moment {
        Moment::Fixed(ts) => ts.with_timezone(zone),
        // Nonexistent wall-clock times (DST gaps) cannot be placed in the zone.
        Moment::Naive(ts) => zone
            .from_local_datetime(&ts)
            .earliest()
            .ok_or_else(|| ValidationError::InvalidDate(original.describe()))?,
    };

    Ok(zoned.format(TIMESTAMP_FORMAT).to_string())
}

fn interpret(value: &ParamValue) -> Result<Option<Moment>, ValidationError> {
    let moment = match value {
        ParamValue::Null => return Ok(None),
        ParamValue::Timestamp(ts) => Moment::Fixed(*ts),
        ParamValue::NaiveTimestamp(ts) => Moment::Naive(*ts),
        ParamValue::Int(millis) => from_millis(*millis, value)?,
        ParamValue::Float(millis) if millis.is_finite() => {
            from_millis(millis.trunc() as i64, value)?
        }
        ParamValue::Text(text) => parse_text(text.trim())
            .ok_or_else(|| ValidationError::InvalidDate(value.describe()))?,
        _ => return Err(ValidationError::InvalidDate(value.describe())),
    };

    Ok(Some(moment))
}

fn from_millis(millis: i64, original: &ParamValue) -> Result<Moment, ValidationError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|ts| Moment::Fixed(ts.fixed_offset()))
        .ok_or_else(|| ValidationError::InvalidDate(original.describe()))
}

fn parse_text(text: &str) -> Option<Moment> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(Moment::Fixed(ts));
    }

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(text, format) {
            return Some(Moment::Fixed(ts));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Moment::Naive(ts));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|day| Moment::Naive(day.and_time(chrono::NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ParamValue {
        ParamValue::Text(s.to_string())
    }

    #[test]
    fn test_naive_text_is_wall_clock_in_zone() {
        let out = format(&text("2024-03-01 10:30:00"), Some("Europe/Istanbul")).unwrap();
        assert_eq!(out.as_deref(), Some("2024-03-01 10:30:00 +0300"));
    }

    #[test]
    fn test_offset_text_is_converted_into_zone() {
        let out = format(&text("2024-03-01T10:30:00Z"), Some("America/New_York")).unwrap();
        assert_eq!(out.as_deref(), Some("2024-03-01 05:30:00 -0500"));
    }

    #[test]
    fn test_epoch_millis() {
        let out = format(&ParamValue::Int(0), Some("UTC")).unwrap();
        assert_eq!(out.as_deref(), Some("1970-01-01 00:00:00 +0000"));
    }

    #[test]
    fn test_date_only_is_midnight() {
        let out = format(&text("2024-12-25"), Some("UTC")).unwrap();
        assert_eq!(out.as_deref(), Some("2024-12-25 00:00:00 +0000"));
    }

    #[test]
    fn test_own_output_parses_back() {
        let out = format(&text("2024-03-01 10:30:00 +0300"), Some("UTC")).unwrap();
        assert_eq!(out.as_deref(), Some("2024-03-01 07:30:00 +0000"));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            format(&text("yesterday"), Some("UTC")),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(matches!(
            format(&text("2024-01-01"), Some("Mars/Olympus")),
            Err(ValidationError::UnknownTimezone(_))
        ));
        assert!(matches!(
            format(&ParamValue::Bool(true), None),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(format(&ParamValue::Null, Some("Mars/Olympus")).unwrap(), None);
    }
}
