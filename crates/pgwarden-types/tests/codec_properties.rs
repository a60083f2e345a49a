//! Property tests for the parameter codec.
//!
//! The quoting properties check the fragment with a minimal dollar-quote
//! scanner that follows the server's lexer: after the opening tag, the
//! constant ends at the first occurrence of the same tag.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use pgwarden_types::{ParamValue, ValidationError, codec, literal};
use proptest::prelude::*;
use uuid::Uuid;

/// Split a dollar-quoted constant into (body, trailing text).
fn scan_dollar_quoted(fragment: &str) -> (String, String) {
    assert!(fragment.starts_with('$'), "not dollar quoted: {fragment}");
    let tag_end = fragment[1..].find('$').expect("unterminated opening tag") + 2;
    let tag = &fragment[..tag_end];
    let rest = &fragment[tag_end..];
    let close = rest.find(tag).expect("unterminated constant");
    (
        rest[..close].to_string(),
        rest[close + tag.len()..].to_string(),
    )
}

proptest! {
    #[test]
    fn prop_string_body_round_trips_and_nothing_trails(value in any::<String>()) {
        prop_assume!(!value.is_empty());
        let quoted = codec::string(value.as_str()).into_inner().unwrap();
        let (body, trailing) = scan_dollar_quoted(&quoted);
        prop_assert_eq!(body, value);
        prop_assert_eq!(trailing, "");
    }

    #[test]
    fn prop_dollar_heavy_values_stay_enclosed(value in "[$qQ0-9a; ]{1,24}") {
        let quoted = literal::dollar_quote(&value);
        let (body, trailing) = scan_dollar_quoted(&quoted);
        prop_assert_eq!(body, value);
        prop_assert_eq!(trailing, "");
    }

    #[test]
    fn prop_valid_uuid_is_single_quoted(bits in any::<u128>()) {
        let text = Uuid::from_u128(bits).hyphenated().to_string();
        prop_assert_eq!(codec::uuid(text.as_str()).unwrap().to_string(), format!("'{text}'"));
    }

    #[test]
    fn prop_non_uuid_text_is_rejected(text in "[^-]{0,40}") {
        prop_assert!(matches!(codec::uuid(text.as_str()), Err(ValidationError::NotUuid(_))));
    }

    #[test]
    fn prop_integers_survive_numeric(n in -(1i64 << 52)..(1i64 << 52)) {
        prop_assert_eq!(codec::numeric(n.to_string()).unwrap(), Some(n as f64));
    }

    #[test]
    fn prop_codecs_never_panic(text in any::<String>()) {
        let _ = codec::numeric(text.as_str());
        let _ = codec::boolean(text.as_str());
        let _ = codec::uuid(text.as_str());
        let _ = codec::date_format(text.as_str(), Some("UTC"));
        let _ = codec::json(text.as_str());
    }
}

#[test]
fn test_every_codec_maps_null_to_null() {
    let nulls = [ParamValue::Null, ParamValue::from(None::<i64>), ParamValue::from(serde_json::Value::Null)];

    for null in nulls {
        assert!(codec::string(null.clone()).is_null());
        assert!(codec::uuid(null.clone()).unwrap().is_null());
        assert_eq!(codec::numeric(null.clone()).unwrap(), None);
        assert_eq!(codec::boolean(null.clone()).unwrap(), None);
        assert_eq!(codec::date_format(null.clone(), None).unwrap(), None);
        assert!(codec::date(null.clone(), Some("UTC")).unwrap().is_null());
        assert!(codec::json(null.clone()).is_null());
        assert_eq!(codec::uuid_array(null.clone()).unwrap(), None);
        assert_eq!(codec::numeric_array(null.clone()).unwrap(), None);
        assert_eq!(codec::string_array(null).unwrap(), None);
    }
}
