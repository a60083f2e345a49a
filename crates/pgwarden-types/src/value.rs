//! Loosely typed parameter values accepted by the codec.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// Longest rendering of a value kept in error messages.
const DESCRIBE_LIMIT: usize = 64;

/// A value on its way into a SQL statement.
///
/// Callers rarely build this directly; every codec function accepts
/// `impl Into<ParamValue>`, so plain Rust values, `Option`s and
/// `serde_json::Value`s can be passed as-is. `None` and JSON `null` become
/// [`ParamValue::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// UUID.
    Uuid(Uuid),
    /// Timestamp with a known offset.
    Timestamp(DateTime<FixedOffset>),
    /// Wall-clock timestamp without an offset.
    NaiveTimestamp(NaiveDateTime),
    /// A JSON object (the other JSON kinds map to the scalar variants).
    Json(serde_json::Value),
    /// A sequence of values.
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// Check whether this is [`ParamValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::NaiveTimestamp(_) => "naive timestamp",
            Self::Json(_) => "json",
            Self::Array(_) => "array",
        }
    }

    /// Coerce to text the way a dynamic language would stringify it.
    ///
    /// Never fails. Arrays join their elements with `,` and render nulls as
    /// empty strings; JSON objects are serialized.
    #[must_use]
    pub fn coerce_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Text(s) => s.clone(),
            Self::Uuid(u) => u.hyphenated().to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339(),
            Self::NaiveTimestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Self::Json(v) => v.to_string(),
            Self::Array(items) => items
                .iter()
                .map(Self::coerce_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Convert to a JSON value for serialization.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            // Non-finite floats have no JSON spelling and serialize as null.
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Uuid(u) => Value::String(u.hyphenated().to_string()),
            Self::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            Self::NaiveTimestamp(_) => Value::String(self.coerce_text()),
            Self::Json(v) => v.clone(),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Bounded rendering for error messages.
    pub(crate) fn describe(&self) -> String {
        let text = match self {
            Self::Null => return "null".to_string(),
            Self::Text(s) => format!("{s:?}"),
            other => format!("{} {}", other.kind(), other.coerce_text()),
        };

        if text.chars().count() <= DESCRIBE_LIMIT {
            text
        } else {
            let truncated: String = text.chars().take(DESCRIBE_LIMIT - 3).collect();
            format!("{truncated}...")
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<DateTime<FixedOffset>> for ParamValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value.fixed_offset())
    }
}

impl From<DateTime<Local>> for ParamValue {
    fn from(value: DateTime<Local>) -> Self {
        Self::Timestamp(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::NaiveTimestamp(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::NaiveTimestamp(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            object @ Value::Object(_) => Self::Json(object),
        }
    }
}

impl From<&serde_json::Value> for ParamValue {
    fn from(value: &serde_json::Value) -> Self {
        Self::from(value.clone())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue> + Clone> From<&[T]> for ParamValue {
    fn from(value: &[T]) -> Self {
        Self::Array(value.iter().cloned().map(Into::into).collect())
    }
}
