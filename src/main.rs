use std::sync::Arc;

use route_approval_api::app::app;
use route_approval_api::audit::AuditLogEngine;
use route_approval_api::auth::{HttpAccountDirectory, JwtVerifier};
use route_approval_api::config;
use route_approval_api::notify::TelegramNotifier;
use route_approval_api::state::AppState;
use route_approval_api::store::lifecycle::{self, LifecycleHub, LifecycleListener};
use route_approval_api::store::postgres::PgStore;
use route_approval_api::store::DocumentStore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();
    tracing_subscriber::fmt::init();

    // Document store with lifecycle channel
    let (hub, events) = LifecycleHub::channel();
    let store = PgStore::connect(&config.database, hub)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {}: {}", config.database.url, e));
    store
        .ensure_schema()
        .await
        .unwrap_or_else(|e| panic!("failed to prepare schema: {}", e));
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    // Audit engine reacts to route lifecycle events off the request path
    let engine = Arc::new(AuditLogEngine::new(store.clone()));
    lifecycle::spawn_dispatcher(events, vec![engine as Arc<dyn LifecycleListener>]);

    let http = reqwest::Client::new();
    let state = AppState::new(
        store,
        Arc::new(JwtVerifier::new(config.security.jwt_secret.clone())),
        Arc::new(TelegramNotifier::new(http.clone(), config.telegram.clone())),
        Arc::new(HttpAccountDirectory::new(
            http,
            config.identity.admin_url.clone(),
            config.identity.admin_key.clone(),
        )),
    );

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("route approval API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.expect("server");
}
