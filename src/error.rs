// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and machine-readable codes.
///
/// Upstream and internal variants surface the original error message in the
/// response body. The original deployment behaved this way and callers rely
/// on it for diagnostics; see DESIGN.md before tightening.
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized
    Unauthenticated(String),

    // 403 Forbidden (role or hub scope violation)
    Forbidden(String),

    // 400 Bad Request (missing/malformed required field)
    InvalidInput(String),

    // 502 Bad Gateway (messaging collaborator failed)
    UpstreamFailure(String),

    // 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InvalidInput(msg)
            | ApiError::UpstreamFailure(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::UpstreamFailure(_) => "UPSTREAM_FAILURE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "ok": false,
            "error": self.message(),
            "code": self.error_code(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn upstream_failure(message: impl Into<String>) -> Self {
        ApiError::UpstreamFailure(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        tracing::error!("store error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<crate::notify::NotifyError> for ApiError {
    fn from(err: crate::notify::NotifyError) -> Self {
        tracing::warn!("notifier error: {}", err);
        ApiError::upstream_failure(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
