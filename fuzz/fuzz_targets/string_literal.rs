//! Fuzz the dollar-quoting rule.
//!
//! A quoted value must start and end with the same tag, and the tag must
//! not occur anywhere in between.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgwarden_types::codec;

fuzz_target!(|value: &str| {
    let literal = codec::string(value);
    let Some(quoted) = literal.as_str() else {
        panic!("non-null input produced NULL");
    };

    let tag_len = quoted[1..].find('$').map(|i| i + 2).expect("opening tag");
    let tag = &quoted[..tag_len];
    assert!(quoted.len() >= tag_len * 2);
    assert!(quoted.ends_with(tag));

    let body = &quoted[tag_len..quoted.len() - tag_len];
    assert_eq!(body, value);
    assert_eq!(format!("{body}{tag}").find(tag), Some(body.len()));
});
