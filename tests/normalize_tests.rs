// Tests for reply normalization: the fixed shape precedence and totality
// over arbitrary well-formed JSON.

use serde_json::json;
use voice_relay::relay::{classify, normalize, RelayReply};

#[test]
fn test_top_level_string_used_verbatim() {
    assert_eq!(normalize(&json!("hi")), "hi");
    assert_eq!(normalize(&json!("")), "");
}

#[test]
fn test_array_clean_text_wins_over_nothing_else() {
    assert_eq!(normalize(&json!([{ "cleanText": "ok" }])), "ok");
}

#[test]
fn test_object_text_field() {
    assert_eq!(normalize(&json!({ "text": "t" })), "t");
}

#[test]
fn test_object_message_field() {
    assert_eq!(normalize(&json!({ "message": "m" })), "m");
}

#[test]
fn test_unrecognized_falls_back_to_serialized_form() {
    assert_eq!(normalize(&json!({ "foo": 1 })), r#"{"foo":1}"#);
}

#[test]
fn test_total_over_degenerate_inputs() {
    // Never panics, always a string
    assert_eq!(normalize(&json!(null)), "null");
    assert_eq!(normalize(&json!({})), "{}");
    assert_eq!(normalize(&json!([])), "[]");
    assert_eq!(normalize(&json!(42)), "42");
    assert_eq!(normalize(&json!(true)), "true");
    assert_eq!(normalize(&json!([1, 2, 3])), "[1,2,3]");
}

#[test]
fn test_precedence_text_beats_message() {
    // Both fields present: `text` wins by the fixed order
    assert_eq!(normalize(&json!({ "text": "t", "message": "m" })), "t");
}

#[test]
fn test_precedence_clean_text_beats_object_fields() {
    let value = json!([{ "cleanText": "first", "text": "ignored" }]);
    assert_eq!(normalize(&value), "first");
}

#[test]
fn test_classify_selects_exactly_one_variant() {
    assert!(matches!(classify(&json!("s")), RelayReply::Text(_)));
    assert!(matches!(
        classify(&json!([{ "cleanText": "a" }, { "cleanText": "b" }])),
        RelayReply::ArrayOfCleanText(ref items) if items == &["a", "b"]
    ));
    assert!(matches!(
        classify(&json!({ "text": "t" })),
        RelayReply::ObjectWithText(_)
    ));
    assert!(matches!(
        classify(&json!({ "message": "m" })),
        RelayReply::ObjectWithMessage(_)
    ));
    assert!(matches!(
        classify(&json!({ "other": true })),
        RelayReply::Unrecognized(_)
    ));
}

#[test]
fn test_array_without_clean_text_is_unrecognized() {
    let value = json!([{ "text": "no cleanText here" }]);
    assert!(matches!(classify(&value), RelayReply::Unrecognized(_)));
    assert_eq!(normalize(&value), value.to_string());
}

#[test]
fn test_normalize_is_pure() {
    let value = json!({ "message": "m" });
    let before = value.clone();
    let _ = normalize(&value);
    assert_eq!(value, before);
}
