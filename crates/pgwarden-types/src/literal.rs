//! SQL literal fragments and the dollar-quoting rule.

use std::fmt;

/// A fragment ready to be interpolated into a statement.
///
/// `None` inside means SQL `NULL`; [`Display`](fmt::Display) renders it as
/// the keyword so `format!("... = {lit}")` is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SqlLiteral(Option<String>);

impl SqlLiteral {
    /// The SQL `NULL` literal.
    pub const NULL: Self = Self(None);

    /// Wrap an already-safe fragment.
    ///
    /// The fragment is emitted verbatim. Only use this for text produced by
    /// the codec or for trusted constants.
    #[must_use]
    pub fn trusted(fragment: impl Into<String>) -> Self {
        Self(Some(fragment.into()))
    }

    /// Check whether this is SQL `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The fragment text, or `None` for `NULL`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Consume and return the fragment text.
    #[must_use]
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(fragment) => f.write_str(fragment),
            None => f.write_str("NULL"),
        }
    }
}

impl From<Option<f64>> for SqlLiteral {
    fn from(value: Option<f64>) -> Self {
        Self(value.map(|n| n.to_string()))
    }
}

impl From<Option<bool>> for SqlLiteral {
    fn from(value: Option<bool>) -> Self {
        Self(value.map(|b| b.to_string()))
    }
}

/// Wrap `value` in a dollar-quoted string constant.
///
/// Uses the bare `$$` delimiter whenever it cannot terminate early. A value
/// that contains `$$`, or ends in `$`, gets the first tag of `$q$`, `$q0$`,
/// `$q1$`, ... for which the only occurrence of the tag in `value + tag` is
/// the closing one.
#[must_use]
pub fn dollar_quote(value: &str) -> String {
    let tag = delimiter_for(value);
    let mut quoted = String::with_capacity(value.len() + tag.len() * 2);
    quoted.push_str(&tag);
    quoted.push_str(value);
    quoted.push_str(&tag);
    quoted
}

fn delimiter_for(value: &str) -> String {
    if closes_only_at_end(value, "$$") {
        return "$$".to_string();
    }
    if closes_only_at_end(value, "$q$") {
        return "$q$".to_string();
    }

    let mut n: usize = 0;
    loop {
        let tag = format!("$q{n}$");
        if closes_only_at_end(value, &tag) {
            return tag;
        }
        n += 1;
    }
}

fn closes_only_at_end(value: &str, tag: &str) -> bool {
    let mut haystack = String::with_capacity(value.len() + tag.len());
    haystack.push_str(value);
    haystack.push_str(tag);
    haystack.find(tag) == Some(value.len())
}

/// Join literals with `,` for `IN (...)` lists and `ARRAY[...]` constructors.
#[must_use]
pub fn list(literals: &[SqlLiteral]) -> String {
    literals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
