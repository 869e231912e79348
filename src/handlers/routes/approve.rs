use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::resolve_access;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::document::Document;
use crate::store::ROUTES;

#[derive(Debug, Deserialize)]
pub struct ApproveRouteRequest {
    pub id: String,
    pub decision: String,
    pub comment: Option<String>,
}

/// POST /api/routes/approve - Record a security decision on a route
pub async fn approve_route(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ApproveRouteRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::invalid_input("id is required"));
    }

    let profile = resolve_access(state.store.as_ref(), &user.uid).await?;
    if !profile.can_decide() {
        return Err(ApiError::forbidden("role does not allow approval decisions"));
    }

    if request.decision != "approved" && request.decision != "rejected" {
        return Err(ApiError::invalid_input("decision must be 'approved' or 'rejected'"));
    }

    // Comment travels only with rejections; approvals clear it.
    let comment = match request.decision.as_str() {
        "rejected" => request.comment.map(Value::String).unwrap_or(Value::Null),
        _ => Value::Null,
    };

    let fields: Document = json!({
        "approval": {
            "status": request.decision,
            "decisionAt": Utc::now().to_rfc3339(),
            "decidedByUid": user.uid,
            "decidedByEmail": user.email,
            "comment": comment,
        },
        "updatedAt": Utc::now().to_rfc3339(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    state.store.set_merge(ROUTES, &request.id, fields).await?;

    tracing::info!(
        route_id = %request.id,
        decision = %request.decision,
        uid = %user.uid,
        "route decision recorded"
    );
    Ok(Json(json!({ "ok": true, "id": request.id, "status": request.decision })))
}
