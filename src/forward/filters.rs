//! Shape checks applied to practice payloads passing through the gateway.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ApiError;

const FILL_TYPES: [&str; 3] = ["fill", "fill_blank", "fill_in_blank"];
const CHOICE_TYPES: [&str; 2] = ["multiple_choice", "choice"];

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn non_empty_array(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty())
}

/// Name of the type-specific field a question lacks, if any.
fn missing_field(obj: &Map<String, Value>) -> Option<&'static str> {
    let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default();
    if FILL_TYPES.contains(&kind) && !non_empty_str(obj, "sentence") {
        return Some("sentence");
    }
    if CHOICE_TYPES.contains(&kind) && !non_empty_array(obj, "options") {
        return Some("options");
    }
    None
}

/// Fill questions need a `sentence`, choice questions need `options`.
/// Other types pass; non-objects never do.
pub fn is_valid_question(q: &Value) -> bool {
    q.as_object().is_some_and(|obj| missing_field(obj).is_none())
}

fn retain_in(list: &mut Vec<Value>) {
    let before = list.len();
    list.retain(is_valid_question);
    let dropped = before - list.len();
    if dropped > 0 {
        debug!(dropped, "dropped malformed practice questions");
    }
}

/// Filters a bare question array or an object wrapping one in
/// `questions` or `data`. Anything else is returned untouched.
pub fn retain_valid_questions(mut payload: Value) -> Value {
    match &mut payload {
        Value::Array(list) => retain_in(list),
        Value::Object(obj) => {
            for key in ["questions", "data"] {
                if let Some(Value::Array(list)) = obj.get_mut(key) {
                    retain_in(list);
                }
            }
        }
        _ => {}
    }
    payload
}

/// Filters the questions of one practice set.
pub fn filter_set(mut set: Value) -> Value {
    if let Some(Value::Array(list)) = set.get_mut("questions") {
        retain_in(list);
    }
    set
}

/// Filters every set in a list (bare or wrapped in `data`).
pub fn filter_sets(payload: Value) -> Value {
    match payload {
        Value::Array(sets) => Value::Array(sets.into_iter().map(filter_set).collect()),
        Value::Object(mut obj) => {
            if let Some(Value::Array(sets)) = obj.remove("data") {
                obj.insert(
                    "data".into(),
                    Value::Array(sets.into_iter().map(filter_set).collect()),
                );
            }
            Value::Object(obj)
        }
        other => other,
    }
}

/// Rejects question bodies the backend would store in a broken shape.
pub fn validate_question_body(body: &Value) -> Result<(), ApiError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ApiError::Validation("Question must be a JSON object".into()))?;
    for field in ["type", "word"] {
        if !non_empty_str(obj, field) {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
    }
    match missing_field(obj) {
        Some(field) => Err(ApiError::Validation(format!(
            "{field} is required for this question type"
        ))),
        None => Ok(()),
    }
}
