//! Shared application state: the externally-owned client handles, built once
//! by the composition root and injected through the router.

use std::sync::Arc;

use crate::auth::{AccountDirectory, IdentityVerifier};
use crate::notify::Notifier;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub notifier: Arc<dyn Notifier>,
    pub directory: Arc<dyn AccountDirectory>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn IdentityVerifier>,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self { store, verifier, notifier, directory }
    }
}
