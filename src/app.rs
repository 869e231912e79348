use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::bearer_auth_middleware;
use crate::state::AppState;
use crate::store::ROUTES;

/// Assemble the full router. Lives in the library so integration tests can
/// drive it in-process.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/routes/save", post(handlers::routes::save_route))
        .route("/api/routes/approve", post(handlers::routes::approve_route))
        .route("/api/routes/proposal", post(handlers::routes::save_proposal))
        .route("/api/users/delete", post(handlers::users::delete_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), bearer_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/send-approval", post(handlers::notify::send_approval))
        // Authenticated API
        .merge(protected)
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive unless CORS_ORIGINS pins an allow-list.
fn cors_layer() -> CorsLayer {
    let origins = &crate::config::config().server.cors_origins;
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<axum::http::HeaderValue> =
        origins.iter().filter_map(|origin| origin.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "ok": true,
        "data": {
            "name": "Route Approval API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "send_approval": "/send-approval (public)",
                "routes": "/api/routes/{save,approve,proposal} (bearer)",
                "users": "/api/users/delete (bearer, admin)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.store.get(ROUTES, "__health__").await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "ok": true,
                "data": { "status": "ok", "timestamp": now, "store": "ok" }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ok": false,
                "error": "store unavailable",
                "data": { "status": "degraded", "timestamp": now, "store_error": e.to_string() }
            })),
        ),
    }
}
