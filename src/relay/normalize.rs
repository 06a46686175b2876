use serde_json::Value;

/// The possible shapes of an agent reply, resolved in a fixed priority order.
///
/// The upstream's reply shape is not guaranteed stable, so classification is
/// an ordered list of shape predicates evaluated top-down; the first match
/// wins and `Unrecognized` catches everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayReply {
    /// Top-level value is a string
    Text(String),
    /// Non-empty array whose first element carries `cleanText`
    ArrayOfCleanText(Vec<String>),
    /// Object with a `text` field
    ObjectWithText(String),
    /// Object with a `message` field
    ObjectWithMessage(String),
    /// Anything else, kept opaque
    Unrecognized(Value),
}

impl RelayReply {
    /// The display string for this reply. Total: `Unrecognized` serializes
    /// the whole structure rather than failing.
    pub fn display_text(&self) -> String {
        match self {
            RelayReply::Text(s) => s.clone(),
            RelayReply::ArrayOfCleanText(items) => {
                items.first().cloned().unwrap_or_default()
            }
            RelayReply::ObjectWithText(s) => s.clone(),
            RelayReply::ObjectWithMessage(s) => s.clone(),
            RelayReply::Unrecognized(v) => v.to_string(),
        }
    }
}

type ShapeMatcher = fn(&Value) -> Option<RelayReply>;

/// Priority order of reply shapes. Reordering these changes which variant
/// wins for ambiguous payloads.
const SHAPES: &[ShapeMatcher] = &[
    match_string,
    match_clean_text_array,
    match_object_text,
    match_object_message,
];

/// Classify a structured reply into exactly one `RelayReply` variant.
pub fn classify(value: &Value) -> RelayReply {
    for matcher in SHAPES {
        if let Some(reply) = matcher(value) {
            return reply;
        }
    }
    RelayReply::Unrecognized(value.clone())
}

/// Reduce a structured reply to its canonical display string.
///
/// Pure and total: every well-formed JSON value maps to a string, with the
/// serialized form as the last-resort fallback.
pub fn normalize(value: &Value) -> String {
    classify(value).display_text()
}

fn match_string(value: &Value) -> Option<RelayReply> {
    value.as_str().map(|s| RelayReply::Text(s.to_string()))
}

fn match_clean_text_array(value: &Value) -> Option<RelayReply> {
    let items = value.as_array()?;
    items.first()?.get("cleanText")?.as_str()?;

    let texts = items
        .iter()
        .filter_map(|item| item.get("cleanText").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    Some(RelayReply::ArrayOfCleanText(texts))
}

fn match_object_text(value: &Value) -> Option<RelayReply> {
    value
        .get("text")
        .and_then(Value::as_str)
        .map(|s| RelayReply::ObjectWithText(s.to_string()))
}

fn match_object_message(value: &Value) -> Option<RelayReply> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(|s| RelayReply::ObjectWithMessage(s.to_string()))
}
