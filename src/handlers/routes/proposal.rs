use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::access::resolve_access;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::document::Document;
use crate::store::ROUTES;

const PROPOSAL_PATH: &str = "approval.securityProposal";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProposalRequest {
    pub id: String,
    #[serde(default)]
    pub clear: bool,
    #[serde(default)]
    pub points: Vec<Value>,
    pub start_ruler: Option<Value>,
    pub end_ruler: Option<Value>,
    pub km: Option<f64>,
}

/// POST /api/routes/proposal - Store or clear a security counter-proposal
pub async fn save_proposal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SaveProposalRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::invalid_input("id is required"));
    }

    let profile = resolve_access(state.store.as_ref(), &user.uid).await?;
    if !profile.can_decide() {
        return Err(ApiError::forbidden("role does not allow security proposals"));
    }

    if request.clear {
        // Remove only the nested proposal; the rest of the approval block
        // stays untouched.
        state.store.delete_field(ROUTES, &request.id, PROPOSAL_PATH).await?;
        tracing::info!(route_id = %request.id, uid = %user.uid, "security proposal cleared");
        return Ok(Json(json!({ "ok": true, "id": request.id, "cleared": true })));
    }

    if request.points.len() < 2 {
        return Err(ApiError::invalid_input("proposal requires at least 2 points"));
    }

    let mut proposal = Map::new();
    proposal.insert("points".into(), Value::Array(request.points));
    proposal.insert("startRuler".into(), request.start_ruler.unwrap_or(Value::Null));
    proposal.insert("endRuler".into(), request.end_ruler.unwrap_or(Value::Null));
    if let Some(km) = request.km {
        proposal.insert("km".into(), json!(km));
    }
    proposal.insert("proposedByUid".into(), Value::String(user.uid.clone()));
    proposal.insert("proposedByEmail".into(), Value::String(user.email.clone()));
    proposal.insert("proposedAt".into(), Value::String(Utc::now().to_rfc3339()));

    let fields: Document = json!({
        "approval": { "securityProposal": proposal },
        "updatedAt": Utc::now().to_rfc3339(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    state.store.set_merge(ROUTES, &request.id, fields).await?;

    tracing::info!(route_id = %request.id, uid = %user.uid, "security proposal saved");
    Ok(Json(json!({ "ok": true, "id": request.id, "saved": true })))
}
