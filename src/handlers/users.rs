use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::resolve_access;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::document::Document;
use crate::store::{WriteBatch, AUDIT, ROLES, USERS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub uid: String,
    #[serde(default)]
    pub delete_auth: bool,
}

/// POST /api/users/delete - Remove a user's profile and role documents
///
/// The document deletions and the audit entry commit atomically. Removing
/// the account from the identity provider is best-effort and never rolls
/// the committed deletions back.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<DeleteUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.uid.trim().is_empty() {
        return Err(ApiError::invalid_input("uid is required"));
    }

    let profile = resolve_access(state.store.as_ref(), &user.uid).await?;
    if !profile.is_admin() {
        return Err(ApiError::forbidden("only admins can delete users"));
    }

    if request.uid == user.uid {
        return Err(ApiError::invalid_input("cannot delete your own account"));
    }

    let audit_entry: Document = json!({
        "action": "deleteUser",
        "targetUid": request.uid,
        "performedByUid": user.uid,
        "performedByEmail": user.email,
        "ts": Utc::now().to_rfc3339(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    let batch = WriteBatch::new()
        .delete(USERS, &request.uid)
        .delete(ROLES, &request.uid)
        .add(AUDIT, audit_entry);
    state.store.commit(batch).await?;

    let auth_deleted = if request.delete_auth {
        match state.directory.delete_account(&request.uid).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(uid = %request.uid, "identity provider deletion failed: {err:#}");
                false
            }
        }
    } else {
        false
    };

    tracing::info!(
        target_uid = %request.uid,
        admin_uid = %user.uid,
        auth_deleted,
        "user deleted"
    );
    Ok(Json(json!({ "ok": true, "uid": request.uid, "authDeleted": auth_deleted })))
}
