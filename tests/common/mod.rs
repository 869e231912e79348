// In-process test harness: a router wired to a MemoryStore with the audit
// dispatcher running, driven through tower::ServiceExt::oneshot so tests
// need no database or network.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use route_approval_api::app::app;
use route_approval_api::audit::AuditLogEngine;
use route_approval_api::auth::{generate_token, AccountDirectory, Claims, JwtVerifier};
use route_approval_api::notify::{ApprovalNotice, Notifier, NotifyError, NotifyReceipt};
use route_approval_api::state::AppState;
use route_approval_api::store::document::Document;
use route_approval_api::store::lifecycle::{self, LifecycleHub, LifecycleListener};
use route_approval_api::store::memory::MemoryStore;
use route_approval_api::store::{DocumentStore, ROUTE_LOGS, USERS};

pub const TEST_SECRET: &str = "route-approval-test-secret";

/// Notifier stub: unconfigured, delivering, or failing at the messaging API.
pub enum StubNotifier {
    Unconfigured,
    Delivers,
    ApiFailure,
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn send_approval(&self, _notice: &ApprovalNotice) -> Result<NotifyReceipt, NotifyError> {
        match self {
            StubNotifier::Unconfigured => Err(NotifyError::NotConfigured),
            StubNotifier::Delivers => Ok(NotifyReceipt { message_id: Some(42) }),
            StubNotifier::ApiFailure => Err(NotifyError::Api {
                status: 403,
                body: r#"{"ok":false,"description":"Forbidden: bot was blocked"}"#.to_string(),
            }),
        }
    }
}

/// Account directory fake that records deletions and can be told to fail.
#[derive(Default)]
pub struct RecordingDirectory {
    pub fail: bool,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl AccountDirectory for RecordingDirectory {
    async fn delete_account(&self, uid: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("identity provider unavailable");
        }
        self.deleted.lock().await.push(uid.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<RecordingDirectory>,
}

pub fn test_app() -> TestApp {
    build_app(false, StubNotifier::Unconfigured)
}

pub fn test_app_with_failing_directory() -> TestApp {
    build_app(true, StubNotifier::Unconfigured)
}

pub fn test_app_with_notifier() -> TestApp {
    build_app(false, StubNotifier::Delivers)
}

pub fn test_app_with_broken_notifier() -> TestApp {
    build_app(false, StubNotifier::ApiFailure)
}

fn build_app(directory_fails: bool, notifier: StubNotifier) -> TestApp {
    let (hub, events) = LifecycleHub::channel();
    let store = Arc::new(MemoryStore::new(hub));

    let engine = Arc::new(AuditLogEngine::new(store.clone() as Arc<dyn DocumentStore>));
    lifecycle::spawn_dispatcher(events, vec![engine as Arc<dyn LifecycleListener>]);

    let directory = Arc::new(RecordingDirectory { fail: directory_fails, deleted: Mutex::new(vec![]) });
    let state = AppState::new(
        store.clone(),
        Arc::new(JwtVerifier::new(TEST_SECRET)),
        Arc::new(notifier),
        directory.clone(),
    );

    TestApp { router: app(state), store, directory }
}

/// Mint a bearer token the app's verifier accepts.
pub fn bearer(uid: &str, email: &str) -> String {
    generate_token(TEST_SECRET, &Claims::new(uid.to_string(), email.to_string(), 1))
        .expect("token minting")
}

/// Seed a user profile document (role + hub scope).
pub async fn seed_profile(store: &MemoryStore, uid: &str, profile: Value) {
    let doc: Document = profile.as_object().cloned().expect("profile object");
    store.set_merge(USERS, uid, doc).await.expect("seed profile");
}

pub async fn post_json(
    router: &Router,
    path: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = builder.body(Body::from(body.to_string())).expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn get_json(router: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("GET").uri(path).body(Body::empty()).expect("request");
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Wait for the async audit path to append at least `min` route log entries.
pub async fn wait_for_logs(store: &MemoryStore, min: usize) -> Vec<Document> {
    for _ in 0..200 {
        let logs = store.list(ROUTE_LOGS).await.expect("list route_logs");
        if logs.len() >= min {
            return logs.into_iter().map(|(_, doc)| doc).collect();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {} route_logs entries", min);
}

/// Give the dispatcher time to drain, then return whatever was logged.
pub async fn settle_logs(store: &MemoryStore) -> Vec<Document> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    store
        .list(ROUTE_LOGS)
        .await
        .expect("list route_logs")
        .into_iter()
        .map(|(_, doc)| doc)
        .collect()
}
