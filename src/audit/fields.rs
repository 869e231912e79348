// Tracked-field projection and actor attribution for route documents.
//
// Route documents are loosely typed and several fields have accumulated
// legacy aliases. Every alias lookup here is an ordered table evaluated
// first-match-wins, never ad hoc branching.

use serde_json::{Map, Value};

use crate::store::document::{first_present, Document};

/// Fields whose changes are recorded in the route log. `status` is synthetic
/// (resolved through STATUS_ALIASES); the rest are read directly.
pub const TRACKED_FIELDS: &[&str] = &[
    "routeKey",
    "hub",
    "fromCode",
    "toCode",
    "fromName",
    "toName",
    "routeType",
    "distance_km",
    "logisticName",
    "logisticId",
    "updatedAt",
];

/// Approval status resolution order, newest layout first.
const STATUS_ALIASES: &[&str] = &[
    "approval.status",
    "approval.result",
    "approval.decision",
    "approvalStatus",
    "approved",
    "status",
];

const UPDATED_BY_UID_ALIASES: &[&str] = &["updatedByUid", "updatedBy"];
const UPDATED_BY_EMAIL_ALIASES: &[&str] = &["updatedByEmail", "updatedByMail"];
const DECIDED_BY_UID_ALIASES: &[&str] = &["decidedByUid", "approval.decidedByUid"];
const DECIDED_BY_EMAIL_ALIASES: &[&str] = &["decidedByEmail", "approval.decidedByEmail"];

/// Project a route document onto the tracked-field schema.
///
/// Absent fields become empty strings so later comparisons are always
/// well-defined; present values (including numbers) pass through untouched.
pub fn project(doc: &Document) -> Map<String, Value> {
    let mut out = Map::new();
    for &field in TRACKED_FIELDS {
        let value = doc.get(field).cloned().unwrap_or(Value::String(String::new()));
        out.insert(field.to_string(), value);
    }
    let status = first_present(doc, STATUS_ALIASES)
        .cloned()
        .unwrap_or(Value::String(String::new()));
    out.insert("status".to_string(), status);
    out
}

/// Identity attributed to a mutation, as declared inside the document
/// payload itself. Both halves may be absent; no inference is attempted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub updated_by_uid: Option<String>,
    pub updated_by_email: Option<String>,
    pub decided_by_uid: Option<String>,
    pub decided_by_email: Option<String>,
}

impl Actor {
    pub fn from_doc(doc: &Document) -> Self {
        Self {
            updated_by_uid: string_alias(doc, UPDATED_BY_UID_ALIASES),
            updated_by_email: string_alias(doc, UPDATED_BY_EMAIL_ALIASES),
            decided_by_uid: string_alias(doc, DECIDED_BY_UID_ALIASES),
            decided_by_email: string_alias(doc, DECIDED_BY_EMAIL_ALIASES),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "updatedByUid": self.updated_by_uid,
            "updatedByEmail": self.updated_by_email,
            "decidedByUid": self.decided_by_uid,
            "decidedByEmail": self.decided_by_email,
        })
    }
}

fn string_alias(doc: &Document, aliases: &[&str]) -> Option<String> {
    first_present(doc, aliases)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
