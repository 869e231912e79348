use serde_json::{Map, Value};

/// A schemaless document, as stored in any collection.
pub type Document = Map<String, Value>;

/// Deep-merge `patch` into `target`, Firestore-style: nested objects merge
/// recursively, everything else (including arrays) replaces the old value.
pub fn deep_merge(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Resolve a dotted path (`approval.status`) against a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut current: Option<&Value> = None;
    for (i, segment) in path.split('.').enumerate() {
        current = if i == 0 {
            doc.get(segment)
        } else {
            current?.as_object()?.get(segment)
        };
    }
    current
}

/// Remove the value at a dotted path. Returns true if something was removed.
/// Parent objects are left in place even when emptied.
pub fn remove_path(doc: &mut Document, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            _ => false,
        },
    }
}

/// Read a string field, treating null/absent/non-string as empty.
pub fn str_field<'a>(doc: &'a Document, key: &str) -> &'a str {
    doc.get(key).and_then(Value::as_str).unwrap_or("")
}

/// First non-null value among a dotted-path alias list, in declared order.
pub fn first_present<'a>(doc: &'a Document, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|path| get_path(doc, path))
        .find(|v| !v.is_null())
}
