use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::notify::{ApprovalNotice, NotifyError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendApprovalRequest {
    pub route_name: Option<String>,
    pub route_id: Option<String>,
    pub review_link: Option<String>,
}

/// POST /send-approval - Forward an approval request to the messaging API
pub async fn send_approval(
    State(state): State<AppState>,
    Json(request): Json<SendApprovalRequest>,
) -> axum::response::Response {
    let notice = ApprovalNotice {
        route_name: request.route_name.unwrap_or_default(),
        route_id: request.route_id.unwrap_or_default(),
        review_link: request.review_link.unwrap_or_default(),
    };

    match state.notifier.send_approval(&notice).await {
        Ok(receipt) => {
            Json(json!({ "ok": true, "messageId": receipt.message_id })).into_response()
        }
        // The legacy forwarder answered 200 when unconfigured so the front
        // end treats it as a soft failure.
        Err(NotifyError::NotConfigured) => (
            StatusCode::OK,
            Json(json!({ "ok": false, "error": "Telegram not configured" })),
        )
            .into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}
