//! Codec methods on pools, connections and transactions.
//!
//! Everything that can run a statement also exposes the literal codec, so
//! statement text and its literals are built from the same handle:
//!
//! ```rust,ignore
//! let sql = format!("SELECT * FROM users WHERE id = {}", conn.uuid(id)?);
//! let rows = conn.query_rows(&sql).await?;
//! ```

use pgwarden_types::{ParamValue, SqlLiteral, ValidationError, codec, literal};
use serde::Serialize;
use uuid::Uuid;

/// Typed-value-to-literal conversion, see [`pgwarden_types::codec`].
///
/// Every method has a default implementation; implementors only opt in.
pub trait ParamCodec {
    /// Dollar-quoted string literal. Never fails.
    fn string(&self, value: impl Into<ParamValue>) -> SqlLiteral {
        codec::string(value)
    }

    /// Text coercion without quoting. Not safe to interpolate.
    fn string_raw(&self, value: impl Into<ParamValue>) -> Option<String> {
        codec::string_raw(value)
    }

    /// Element-wise [`string`](Self::string).
    fn string_array(
        &self,
        value: impl Into<ParamValue>,
    ) -> Result<Option<Vec<SqlLiteral>>, ValidationError> {
        codec::string_array(value)
    }

    /// Single-quoted UUID literal.
    fn uuid(&self, value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
        codec::uuid(value)
    }

    /// Validated UUID text without quoting.
    fn uuid_raw(&self, value: impl Into<ParamValue>) -> Result<Option<String>, ValidationError> {
        codec::uuid_raw(value)
    }

    /// Element-wise [`uuid`](Self::uuid).
    fn uuid_array(
        &self,
        value: impl Into<ParamValue>,
    ) -> Result<Option<Vec<SqlLiteral>>, ValidationError> {
        codec::uuid_array(value)
    }

    /// Finite number.
    fn numeric(&self, value: impl Into<ParamValue>) -> Result<Option<f64>, ValidationError> {
        codec::numeric(value)
    }

    /// Alias of [`numeric`](Self::numeric).
    fn number(&self, value: impl Into<ParamValue>) -> Result<Option<f64>, ValidationError> {
        codec::number(value)
    }

    /// [`numeric`](Self::numeric) rendered as a literal.
    fn numeric_literal(&self, value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
        codec::numeric_literal(value)
    }

    /// Element-wise [`numeric`](Self::numeric).
    fn numeric_array(
        &self,
        value: impl Into<ParamValue>,
    ) -> Result<Option<Vec<Option<f64>>>, ValidationError> {
        codec::numeric_array(value)
    }

    /// Alias of [`numeric_array`](Self::numeric_array).
    fn number_array(
        &self,
        value: impl Into<ParamValue>,
    ) -> Result<Option<Vec<Option<f64>>>, ValidationError> {
        codec::number_array(value)
    }

    /// Strict boolean.
    #[doc(alias = "bool")]
    fn boolean(&self, value: impl Into<ParamValue>) -> Result<Option<bool>, ValidationError> {
        codec::boolean(value)
    }

    /// [`boolean`](Self::boolean) rendered as a literal.
    fn boolean_literal(&self, value: impl Into<ParamValue>) -> Result<SqlLiteral, ValidationError> {
        codec::boolean_literal(value)
    }

    /// Timestamp text, converted into `timezone` when given.
    fn date_format(
        &self,
        value: impl Into<ParamValue>,
        timezone: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        codec::date_format(value, timezone)
    }

    /// [`date_format`](Self::date_format) as a string literal.
    fn date(
        &self,
        value: impl Into<ParamValue>,
        timezone: Option<&str>,
    ) -> Result<SqlLiteral, ValidationError> {
        codec::date(value, timezone)
    }

    /// JSON text as a string literal.
    fn json(&self, value: impl Into<ParamValue>) -> SqlLiteral {
        codec::json(value)
    }

    /// Any serializable value as a JSON string literal.
    fn json_of<T: Serialize + ?Sized>(&self, value: &T) -> Result<SqlLiteral, ValidationError> {
        codec::json_of(value)
    }

    /// Comma-joined literals for `IN (...)` and `ARRAY[...]`.
    fn list(&self, literals: &[SqlLiteral]) -> String {
        literal::list(literals)
    }

    /// Random (v4) UUID.
    fn new_uuid(&self) -> Uuid {
        codec::new_uuid()
    }
}
