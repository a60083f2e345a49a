//! Codec error types.

use thiserror::Error;

/// A value could not be represented safely as a SQL literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Value is not a canonical UUID.
    #[error("parameter is not a UUID: {0}")]
    NotUuid(String),

    /// Value cannot be converted to a finite number.
    #[error("parameter is not numeric: {0}")]
    NotNumeric(String),

    /// Value is neither `true`, `false`, nor one of their string spellings.
    #[error("parameter is not boolean: {0}")]
    NotBoolean(String),

    /// An array codec received something other than a sequence.
    #[error("parameter is not an array: {0}")]
    NotArray(String),

    /// Value cannot be interpreted as a point in time.
    #[error("parameter is not a date: {0}")]
    InvalidDate(String),

    /// Time zone identifier is not a known IANA zone.
    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),

    /// The serializer rejected the value.
    #[error("parameter cannot be serialized as JSON: {0}")]
    Json(String),
}
