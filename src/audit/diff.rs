// Field-level diffing between two tracked-field projections.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One changed field, ready for display: nulls are already normalized to
/// empty strings, numbers pass through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub was: Value,
    pub now: Value,
}

impl FieldChange {
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "field": self.field, "was": self.was, "now": self.now })
    }
}

/// Compute the changed fields between two projections.
///
/// Keys are the symmetric union of both sides; two values are equal when
/// strictly equal or when both are blank (null or empty string). The
/// synthetic `updatedAt` field is dropped after computation since it changes
/// on every write and carries no information.
pub fn diff(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<FieldChange> {
    let fields: BTreeSet<&str> =
        before.keys().map(String::as_str).chain(after.keys().map(String::as_str)).collect();

    fields
        .into_iter()
        .filter(|&field| field != "updatedAt")
        .filter_map(|field| {
            let was = before.get(field);
            let now = after.get(field);
            if values_equal(was, now) {
                return None;
            }
            Some(FieldChange {
                field: field.to_string(),
                was: display_value(was),
                now: display_value(now),
            })
        })
        .collect()
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    a == b || (is_blank(a) && is_blank(b))
}

fn display_value(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(v) => v.clone(),
    }
}
