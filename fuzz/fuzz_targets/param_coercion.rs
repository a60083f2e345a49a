//! Fuzz every codec entry point with arbitrary values. None may panic, and
//! every literal that comes back as text must be well formed.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pgwarden_types::{ParamValue, codec};
use uuid::Uuid;

#[derive(Debug, Arbitrary)]
enum Input {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes([u8; 16]),
    Json(String),
    Array(Vec<Option<String>>),
}

impl From<Input> for ParamValue {
    fn from(input: Input) -> Self {
        match input {
            Input::Null => ParamValue::Null,
            Input::Bool(b) => b.into(),
            Input::Int(i) => i.into(),
            Input::Float(f) => f.into(),
            Input::Text(s) => s.into(),
            Input::Bytes(b) => Uuid::from_bytes(b).into(),
            Input::Json(s) => serde_json::from_str::<serde_json::Value>(&s)
                .map(ParamValue::from)
                .unwrap_or(ParamValue::Text(s)),
            Input::Array(items) => items.into(),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Case {
    value: Input,
    timezone: Option<String>,
}

fuzz_target!(|case: Case| {
    let value = ParamValue::from(case.value);

    let _ = codec::string_raw(value.clone());
    let _ = codec::json(value.clone());
    let _ = codec::string_array(value.clone());
    let _ = codec::uuid_array(value.clone());
    let _ = codec::numeric_array(value.clone());
    let _ = codec::date_format(value.clone(), case.timezone.as_deref());
    let _ = codec::date(value.clone(), case.timezone.as_deref());

    if let Ok(Some(n)) = codec::numeric(value.clone()) {
        assert!(n.is_finite());
    }
    if let Ok(literal) = codec::uuid(value.clone()) {
        if let Some(text) = literal.as_str() {
            assert!(text.len() > 2 && text.starts_with('\'') && text.ends_with('\''));
            assert!(!text[1..text.len() - 1].contains('\''));
        }
    }
    if let Ok(Some(b)) = codec::boolean(value.clone()) {
        assert_eq!(codec::boolean_literal(value).unwrap().to_string(), b.to_string());
    }
});
