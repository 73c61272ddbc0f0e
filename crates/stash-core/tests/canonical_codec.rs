// crates/stash-core/tests/canonical_codec.rs
// ============================================================================
// Module: Canonical Codec Tests
// Description: Verifies the deterministic round-trip behavior of the value codec.
// ============================================================================
//! ## Overview
//! Ensures canonical text encoding is deterministic across map insertion
//! order, preserves numeric representation exactly, and rejects text that is
//! not valid JSON.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use stash_core::canonical::CanonicalError;
use stash_core::canonical::from_canonical_text;
use stash_core::canonical::to_canonical_text;

#[test]
fn canonical_text_is_order_independent_for_maps() {
    let mut map_a = Map::new();
    map_a.insert("b".to_string(), json!(2));
    map_a.insert("a".to_string(), json!(1));

    let mut map_b = Map::new();
    map_b.insert("a".to_string(), json!(1));
    map_b.insert("b".to_string(), json!(2));

    let text_a = to_canonical_text(&Value::Object(map_a)).expect("encode a");
    let text_b = to_canonical_text(&Value::Object(map_b)).expect("encode b");

    assert_eq!(text_a, text_b);
    assert_eq!(text_a, r#"{"a":1,"b":2}"#);
}

#[test]
fn canonical_text_keeps_floats_distinct_from_integers() {
    let float_text = to_canonical_text(&json!(1.0)).expect("encode float");
    let int_text = to_canonical_text(&json!(1)).expect("encode int");

    assert_eq!(float_text, "1.0");
    assert_eq!(int_text, "1");

    let float_back = from_canonical_text(&float_text).expect("decode float");
    let int_back = from_canonical_text(&int_text).expect("decode int");
    assert_eq!(float_back, json!(1.0));
    assert_eq!(int_back, json!(1));
    assert_ne!(float_back, int_back, "1.0 and 1 must stay distinct values");
}

#[test]
fn canonical_text_preserves_integer_extremes() {
    for value in [json!(i64::MIN), json!(i64::MAX), json!(u64::MAX)] {
        let text = to_canonical_text(&value).expect("encode");
        let back = from_canonical_text(&text).expect("decode");
        assert_eq!(back, value);
    }
}

#[test]
fn canonical_text_round_trips_structured_values() {
    let value = json!({
        "name": "Test",
        "value": 123,
        "nested": {"flag": true, "items": [1, 2.5, "three", null]},
        "empty_map": {},
        "empty_list": []
    });
    let text = to_canonical_text(&value).expect("encode");
    let back = from_canonical_text(&text).expect("decode");
    assert_eq!(back, value);
}

#[test]
fn canonical_text_preserves_sequence_order() {
    let value = json!([3, 1, 2]);
    let text = to_canonical_text(&value).expect("encode");
    assert_eq!(text, "[3,1,2]");
    assert_eq!(from_canonical_text(&text).expect("decode"), value);
}

#[test]
fn canonical_text_round_trips_unicode() {
    let value = json!({"emoji": "Hello, 世界! 🎉"});
    let text = to_canonical_text(&value).expect("encode");
    let back = from_canonical_text(&text).expect("decode");
    assert_eq!(back, value);
}

#[test]
fn canonical_text_round_trips_deep_nesting() {
    let mut value = json!({});
    for depth in 0 .. 64 {
        let mut wrapper = Map::new();
        wrapper.insert(format!("level{depth}"), value);
        value = Value::Object(wrapper);
    }
    let text = to_canonical_text(&value).expect("encode");
    let back = from_canonical_text(&text).expect("decode");
    assert_eq!(back, value);
}

#[test]
fn encoding_is_stable_across_calls() {
    let value = json!({"a": 1, "b": [1, 2, 3], "c": {"nested": true}});
    let first = to_canonical_text(&value).expect("first");
    let second = to_canonical_text(&value).expect("second");
    assert_eq!(first, second, "Encoding must be deterministic");
}

// ============================================================================
// SECTION: Foreign Text Rejection
// ============================================================================

#[test]
fn decode_rejects_non_json_text() {
    let err = from_canonical_text("not json at all").unwrap_err();
    assert!(matches!(err, CanonicalError::Decode(_)));
}

#[test]
fn decode_rejects_truncated_text() {
    let err = from_canonical_text(r#"{"a": 1"#).unwrap_err();
    assert!(matches!(err, CanonicalError::Decode(_)));
}

#[test]
fn decode_rejects_empty_text() {
    let err = from_canonical_text("").unwrap_err();
    assert!(matches!(err, CanonicalError::Decode(_)));
}

#[test]
fn decode_rejects_trailing_garbage() {
    let err = from_canonical_text(r#"{"a": 1} extra"#).unwrap_err();
    assert!(matches!(err, CanonicalError::Decode(_)));
}
