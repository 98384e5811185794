use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::user::user_router;
use crate::auth::{IdentityVerifier, StoreIdentityVerifier};
use crate::clock::Clock;
use crate::service::{
    AccessGate, CredentialIssuer, Directory, NamespaceStore, RetentionSweeper, VersionedKeyStore,
};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub access: AccessGate,
    pub namespaces: NamespaceStore,
    pub keys: VersionedKeyStore,
    pub credentials: CredentialIssuer,
    pub directory: Directory,
    pub sweeper: Arc<RetentionSweeper>,
}

impl AppState {
    /// Wires every service to the same store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, log_detailed_sweeps: bool) -> Self {
        Self {
            verifier: Arc::new(StoreIdentityVerifier::new(store.clone(), clock.clone())),
            access: AccessGate::new(store.clone(), clock.clone()),
            namespaces: NamespaceStore::new(store.clone(), clock.clone()),
            keys: VersionedKeyStore::new(store.clone(), clock.clone()),
            credentials: CredentialIssuer::new(store.clone(), clock.clone()),
            directory: Directory::new(store.clone(), clock.clone()),
            sweeper: Arc::new(RetentionSweeper::new(
                store.clone(),
                clock.clone(),
                log_detailed_sweeps,
            )),
            store,
            clock,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router(&state))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
