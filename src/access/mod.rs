// Access Resolver: maps an authenticated identity to {role, allowed hubs}
// by reading its profile document.

use serde_json::Value;
use std::collections::HashSet;

use crate::store::document::{first_present, Document};
use crate::store::{DocumentStore, StoreError, USERS};

/// Hub-list field aliases accumulated over the app's history, evaluated
/// first-match-wins.
const HUB_ALIASES: &[&str] = &["allowedHubs", "hubs", "hub", "hubAccess"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Security,
    Logist,
    User,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            "security" => Role::Security,
            "logist" => Role::Logist,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Security => "security",
            Role::Logist => "logist",
            Role::User => "user",
        }
    }
}

/// Per-identity access scope. An empty hub set means unrestricted.
#[derive(Debug, Clone)]
pub struct AccessProfile {
    pub role: Role,
    pub allowed_hubs: HashSet<String>,
}

impl AccessProfile {
    /// Fail-open default: no profile document means a plain user with
    /// access to every hub. Intentional, see DESIGN.md.
    pub fn default_user() -> Self {
        Self { role: Role::User, allowed_hubs: HashSet::new() }
    }

    pub fn can_edit_routes(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Security | Role::Logist)
    }

    pub fn can_decide(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Security)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn hub_allowed(&self, hub: &str) -> bool {
        self.allowed_hubs.is_empty() || self.allowed_hubs.contains(hub)
    }

    pub fn from_profile(doc: &Document) -> Self {
        let role = doc
            .get("role")
            .and_then(Value::as_str)
            .map(Role::parse)
            .unwrap_or(Role::User);

        let allowed_hubs = first_present(doc, HUB_ALIASES)
            .map(normalize_hubs)
            .unwrap_or_default();

        Self { role, allowed_hubs }
    }
}

/// Hub values appear as an array of strings or a bare string depending on
/// the profile's age. Blanks are dropped either way.
fn normalize_hubs(value: &Value) -> HashSet<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(hub) if !hub.trim().is_empty() => {
            HashSet::from([hub.trim().to_string()])
        }
        _ => HashSet::new(),
    }
}

/// Look up the caller's access profile from its user document.
pub async fn resolve_access(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<AccessProfile, StoreError> {
    let profile = match store.get(USERS, uid).await? {
        Some(doc) => AccessProfile::from_profile(&doc),
        None => AccessProfile::default_user(),
    };
    tracing::debug!(uid, role = profile.role.as_str(), "access resolved");
    Ok(profile)
}
