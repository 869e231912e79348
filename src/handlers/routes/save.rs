use axum::{extract::State, Extension, Json};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::resolve_access;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::document::{str_field, Document};
use crate::store::ROUTES;

#[derive(Debug, Deserialize)]
pub struct SaveRouteRequest {
    pub id: String,
    pub data: Value,
}

/// POST /api/routes/save - Create or update a route document
pub async fn save_route(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SaveRouteRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::invalid_input("id is required"));
    }
    let data: Document = match request.data {
        Value::Object(map) => map,
        _ => return Err(ApiError::invalid_input("data must be an object")),
    };

    let profile = resolve_access(state.store.as_ref(), &user.uid).await?;
    if !profile.can_edit_routes() {
        return Err(ApiError::forbidden("role does not allow editing routes"));
    }

    for field in ["fromCode", "toCode", "routeType"] {
        if str_field(&data, field).trim().is_empty() {
            return Err(ApiError::invalid_input(format!("{} is required", field)));
        }
    }

    let hub = str_field(&data, "hub");
    if !profile.hub_allowed(hub) {
        return Err(ApiError::forbidden(format!("hub '{}' is outside your allowed hubs", hub)));
    }

    // routeKey is assigned exactly once: a stored key always wins, a
    // caller-supplied key is honored only on the first write.
    let existing = state.store.get(ROUTES, &request.id).await?;
    let route_key = existing
        .as_ref()
        .map(|doc| str_field(doc, "routeKey"))
        .filter(|key| !key.is_empty())
        .or_else(|| Some(str_field(&data, "routeKey")).filter(|key| !key.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            generate_route_key(str_field(&data, "fromName"), str_field(&data, "toName"))
        });

    let mut fields = data;
    fields.insert("routeKey".into(), Value::String(route_key.clone()));
    fields.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));
    fields.insert("updatedByUid".into(), Value::String(user.uid.clone()));
    fields.insert("updatedByEmail".into(), Value::String(user.email.clone()));

    state.store.set_merge(ROUTES, &request.id, fields).await?;

    tracing::info!(route_id = %request.id, route_key = %route_key, uid = %user.uid, "route saved");
    Ok(Json(json!({ "ok": true, "id": request.id, "routeKey": route_key })))
}

/// `<first-letter(fromName)><first-letter(toName)>-<10 random digits>`
pub fn generate_route_key(from_name: &str, to_name: &str) -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..10).map(|_| rng.gen_range(0..=9).to_string()).collect();
    format!("{}{}-{}", first_letter(from_name), first_letter(to_name), digits)
}

/// First Latin or Cyrillic letter of the string, uppercased; `X` when the
/// string has none.
pub fn first_letter(s: &str) -> char {
    s.chars()
        .find(|c| c.is_ascii_alphabetic() || ('\u{0400}'..='\u{04FF}').contains(c))
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('X')
}
