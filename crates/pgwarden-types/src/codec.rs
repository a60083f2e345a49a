//! Typed-value-to-literal conversion functions.
//!
//! All functions are pure. Null input (`None`, JSON `null`,
//! [`ParamValue::Null`]) yields SQL `NULL` and never fails. The `*_raw`
//! variants return the validated value without quoting, for callers that
//! bind it some other way.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::date;
use crate::error::ValidationError;
use crate::literal::{self, SqlLiteral};
use crate::value::ParamValue;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Dollar-quoted string literal.
///
/// Any value can be coerced to text, so this never fails. The empty string
/// is returned as-is (an empty fragment), matching the raw form.
#[must_use]
pub fn string(value: impl Into<ParamValue>) -> SqlLiteral {
    match string_raw(value) {
        None => SqlLiteral::NULL,
        Some(text) if text.is_empty() => SqlLiteral::trusted(text),
        Some(text) => SqlLiteral::trusted(literal::dollar_quote(&text)),
    }
}

/// Text coercion without quoting.
#[must_use]
pub fn string_raw(value: impl Into<ParamValue>) -> Option<String> {
    let value = value.into();
    if value.is_null() {
        None
    } else {
        Some(value.coerce_text())
    }
}

/// Single-quoted UUID literal.
pub fn uuid(value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
    Ok(match uuid_raw(value)? {
        Some(text) => SqlLiteral::trusted(format!("'{text}'")),
        None => SqlLiteral::NULL,
    })
}

/// Validated UUID text without quoting. Case is preserved.
pub fn uuid_raw(value: impl Into<ParamValue>) -> Result<Option<String>, ValidationError> {
    match value.into() {
        ParamValue::Null => Ok(None),
        ParamValue::Uuid(u) => Ok(Some(u.hyphenated().to_string())),
        ParamValue::Text(text) if UUID_RE.is_match(&text) => Ok(Some(text)),
        other => Err(ValidationError::NotUuid(other.describe())),
    }
}

/// Convert to a finite number.
pub fn numeric(value: impl Into<ParamValue>) -> Result<Option<f64>, ValidationError> {
    let value = value.into();
    let number = match &value {
        ParamValue::Null => return Ok(None),
        ParamValue::Bool(b) => f64::from(u8::from(*b)),
        ParamValue::Int(i) => *i as f64,
        ParamValue::Float(f) => *f,
        ParamValue::Text(text) => parse_number(text).unwrap_or(f64::NAN),
        ParamValue::Timestamp(ts) => ts.timestamp_millis() as f64,
        ParamValue::NaiveTimestamp(ts) => ts.and_utc().timestamp_millis() as f64,
        ParamValue::Uuid(_) | ParamValue::Json(_) | ParamValue::Array(_) => f64::NAN,
    };

    if number.is_finite() {
        Ok(Some(number))
    } else {
        Err(ValidationError::NotNumeric(value.describe()))
    }
}

/// Alias of [`numeric`].
pub fn number(value: impl Into<ParamValue>) -> Result<Option<f64>, ValidationError> {
    numeric(value)
}

/// [`numeric`] rendered as a literal.
pub fn numeric_literal(value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
    numeric(value).map(SqlLiteral::from)
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }

    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&text[2..], radix).ok().map(|n| n as f64);
    }

    // Rust accepts "inf" and "nan" spellings; only finite values pass.
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Strict boolean. Accepts `true`/`false` and the exact strings
/// `"true"`/`"false"`.
pub fn boolean(value: impl Into<ParamValue>) -> Result<Option<bool>, ValidationError> {
    match value.into() {
        ParamValue::Null => Ok(None),
        ParamValue::Bool(b) => Ok(Some(b)),
        ParamValue::Text(text) if text == "true" => Ok(Some(true)),
        ParamValue::Text(text) if text == "false" => Ok(Some(false)),
        other => Err(ValidationError::NotBoolean(other.describe())),
    }
}

/// [`boolean`] rendered as a literal.
pub fn boolean_literal(value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
    boolean(value).map(SqlLiteral::from)
}

/// Format as `YYYY-MM-DD HH:mm:ss ZZ`, converted into `timezone` when given.
pub fn date_format(
    value: impl Into<ParamValue>,
    timezone: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    date::format(&value.into(), timezone)
}

/// [`date_format`] wrapped by [`string`].
pub fn date(
    value: impl Into<ParamValue>,
    timezone: Option<&str>,
) -> Result<SqlLiteral, ValidationError> {
    date_format(value, timezone).map(string)
}

/// Serialize to JSON and quote like [`string`].
#[must_use]
pub fn json(value: impl Into<ParamValue>) -> SqlLiteral {
    let value = value.into();
    if value.is_null() {
        return SqlLiteral::NULL;
    }
    string(value.to_json().to_string())
}

/// Serialize any [`Serialize`] value and quote like [`string`].
///
/// Fails with whatever the serializer reports, e.g. a map with non-string
/// keys.
pub fn json_of<T: Serialize + ?Sized>(value: &T) -> Result<SqlLiteral, ValidationError> {
    let serialized = serde_json::to_value(value).map_err(|e| ValidationError::Json(e.to_string()))?;
    if serialized.is_null() {
        return Ok(SqlLiteral::NULL);
    }
    Ok(string(serialized.to_string()))
}

fn elements(value: ParamValue) -> Result<Option<Vec<ParamValue>>, ValidationError> {
    match value {
        ParamValue::Null => Ok(None),
        ParamValue::Array(items) => Ok(Some(items)),
        other => Err(ValidationError::NotArray(other.describe())),
    }
}

/// Element-wise [`uuid`].
pub fn uuid_array(value: impl Into<ParamValue>) -> Result<Option<Vec<SqlLiteral>>, ValidationError> {
    elements(value.into())?
        .map(|items| items.into_iter().map(uuid).collect())
        .transpose()
}

/// Element-wise [`numeric`].
pub fn numeric_array(
    value: impl Into<ParamValue>,
) -> Result<Option<Vec<Option<f64>>>, ValidationError> {
    elements(value.into())?
        .map(|items| items.into_iter().map(numeric).collect())
        .transpose()
}

/// Alias of [`numeric_array`].
pub fn number_array(
    value: impl Into<ParamValue>,
) -> Result<Option<Vec<Option<f64>>>, ValidationError> {
    numeric_array(value)
}

/// Element-wise [`string`].
pub fn string_array(
    value: impl Into<ParamValue>,
) -> Result<Option<Vec<SqlLiteral>>, ValidationError> {
    Ok(elements(value.into())?.map(|items| items.into_iter().map(string).collect()))
}

/// Generate a random (v4) UUID.
#[must_use]
pub fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "5f0c6f3e-4d1b-4c52-9a8e-0b6f3f1f2a77";

    #[test]
    fn test_string_quotes_and_passes_empty() {
        assert_eq!(string("abc").to_string(), "$$abc$$");
        assert_eq!(string("").to_string(), "");
        assert_eq!(string(12).to_string(), "$$12$$");
        assert_eq!(string_raw("abc").as_deref(), Some("abc"));
    }

    #[test]
    fn test_string_cannot_be_broken_out_of() {
        let hostile = "x$$; DROP TABLE users; --";
        let quoted = string(hostile).into_inner().unwrap();
        assert_eq!(quoted, format!("$q${hostile}$q$"));
    }

    #[test]
    fn test_uuid_accepts_canonical_form_only() {
        assert_eq!(uuid(ID).unwrap().to_string(), format!("'{ID}'"));
        assert_eq!(uuid_raw(ID.to_uppercase()).unwrap(), Some(ID.to_uppercase()));
        assert!(uuid("not-a-uuid").is_err());
        assert!(uuid(format!("{{{ID}}}")).is_err());
        assert!(uuid(format!("'{ID}'")).is_err());
        assert!(uuid(7).is_err());
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(numeric("42").unwrap(), Some(42.0));
        assert_eq!(numeric(" 1.5e2 ").unwrap(), Some(150.0));
        assert_eq!(numeric("0x1F").unwrap(), Some(31.0));
        assert_eq!(numeric("").unwrap(), Some(0.0));
        assert_eq!(numeric(true).unwrap(), Some(1.0));
        assert!(matches!(numeric("abc"), Err(ValidationError::NotNumeric(_))));
        assert!(numeric("Infinity").is_err());
        assert!(numeric(f64::NAN).is_err());
        assert!(numeric(serde_json::json!({"n": 1})).is_err());
    }

    #[test]
    fn test_numeric_literal_renders_integers_plainly() {
        assert_eq!(numeric_literal("42").unwrap().to_string(), "42");
        assert_eq!(numeric_literal(None::<i32>).unwrap().to_string(), "NULL");
    }

    #[test]
    fn test_boolean_spellings() {
        assert_eq!(boolean("true").unwrap(), Some(true));
        assert_eq!(boolean("false").unwrap(), Some(false));
        assert_eq!(boolean(false).unwrap(), Some(false));
        assert!(matches!(boolean("yes"), Err(ValidationError::NotBoolean(_))));
        assert!(boolean("TRUE").is_err());
        assert!(boolean(1).is_err());
    }

    #[test]
    fn test_json_uses_string_quoting() {
        assert_eq!(json(serde_json::json!({"a": 1})).to_string(), r#"$${"a":1}$$"#);
        assert_eq!(json(vec![1, 2]).to_string(), "$$[1,2]$$");
        assert_eq!(json(serde_json::Value::Null).to_string(), "NULL");
    }

    #[test]
    fn test_json_of_reports_serializer_failure() {
        use std::collections::BTreeMap;

        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        assert!(matches!(json_of(&bad), Err(ValidationError::Json(_))));

        #[derive(Serialize)]
        struct Event {
            total: u32,
        }
        assert_eq!(json_of(&Event { total: 3 }).unwrap().to_string(), r#"$${"total":3}$$"#);
    }

    #[test]
    fn test_date_composes_format_and_string() {
        let lit = date("2024-03-01 10:30:00", Some("UTC")).unwrap();
        assert_eq!(lit.to_string(), "$$2024-03-01 10:30:00 +0000$$");
        assert!(date(None::<&str>, None).unwrap().is_null());
    }

    #[test]
    fn test_arrays_map_element_wise() {
        let ids = uuid_array(vec![ID, ID]).unwrap().unwrap();
        assert_eq!(literal::list(&ids), format!("'{ID}','{ID}'"));

        assert_eq!(
            numeric_array(vec!["1", "2"]).unwrap(),
            Some(vec![Some(1.0), Some(2.0)])
        );
        assert_eq!(
            string_array(vec![Some("a"), None]).unwrap(),
            Some(vec![SqlLiteral::trusted("$$a$$"), SqlLiteral::NULL])
        );
    }

    #[test]
    fn test_arrays_reject_scalars_and_propagate_element_errors() {
        assert!(matches!(uuid_array(ID), Err(ValidationError::NotArray(_))));
        assert!(matches!(string_array(3), Err(ValidationError::NotArray(_))));
        assert!(matches!(
            numeric_array(vec!["1", "x"]),
            Err(ValidationError::NotNumeric(_))
        ));
        assert!(matches!(
            uuid_array(vec![ID, "bad"]),
            Err(ValidationError::NotUuid(_))
        ));
    }

    #[test]
    fn test_null_is_total() {
        let none = || None::<String>;
        assert!(string(none()).is_null());
        assert!(uuid(none()).unwrap().is_null());
        assert_eq!(numeric(none()).unwrap(), None);
        assert_eq!(boolean(none()).unwrap(), None);
        assert_eq!(date_format(none(), Some("UTC")).unwrap(), None);
        assert!(date(none(), None).unwrap().is_null());
        assert!(json(none()).is_null());
        assert_eq!(uuid_array(none()).unwrap(), None);
        assert_eq!(numeric_array(none()).unwrap(), None);
        assert_eq!(string_array(none()).unwrap(), None);
    }

    #[test]
    fn test_new_uuid_is_valid_input() {
        let id = new_uuid();
        assert!(uuid(id.to_string()).is_ok());
    }
}
