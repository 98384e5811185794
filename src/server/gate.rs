//! Per-route-group role enforcement for namespace-scoped endpoints.
//!
//! The gate authenticates the caller, works out which namespace the request
//! targets, resolves the caller's role there and either rejects the request
//! or hands a [`NamespaceContext`] to the handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{Query, Request, State},
    http::{Method, Uri, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{Caller, authenticate_caller};
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::service::{AccessGate, Decision, parse_namespace_id};
use crate::types::Role;

const NAMESPACE_ID_PARAM: &str = "namespaceId";
const MAX_PEEK_BYTES: usize = 2 * 1024 * 1024;

/// The namespace a request was authorized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceContext {
    pub namespace_id: i64,
    pub subject_id: i64,
    /// The caller's effective role, which may exceed the one required.
    pub role: Role,
}

/// Middleware state: the app plus the minimum role for a route group.
#[derive(Clone)]
pub struct RoleGate {
    state: Arc<AppState>,
    required: Role,
}

impl RoleGate {
    #[must_use]
    pub fn new(state: &Arc<AppState>, required: Role) -> Self {
        Self {
            state: Arc::clone(state),
            required,
        }
    }
}

pub async fn require_role(State(gate): State<RoleGate>, request: Request, next: Next) -> Response {
    match authorize(&gate, request).await {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

async fn authorize(gate: &RoleGate, request: Request) -> std::result::Result<Request, Response> {
    let caller = authenticate_caller(request.headers(), &gate.state)
        .map_err(IntoResponse::into_response)?;

    let (requested, mut request) = namespace_id_from_request(request)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    let namespace_id = match (requested, &caller) {
        (Some(id), _) => id,
        (None, Caller::Credential { credential, .. }) => credential.namespace_id,
        (None, Caller::Session { .. }) => {
            return Err(ApiError::forbidden("Namespace context required").into_response());
        }
    };

    let resolution = match &caller {
        Caller::Session { user, .. } => gate
            .state
            .access
            .resolve_membership(user.id, namespace_id)
            .map_err(|e| ApiError::from(e).into_response())?,
        Caller::Credential { credential, .. } => {
            gate.state.access.resolve_credential(credential, namespace_id)
        }
    };

    match AccessGate::enforce(resolution, gate.required) {
        Decision::Allowed(role) => {
            debug!(namespace_id, subject_id = caller.subject_id(), %role, "access granted");
            request.extensions_mut().insert(NamespaceContext {
                namespace_id,
                subject_id: caller.subject_id(),
                role,
            });
            request.extensions_mut().insert(caller);
            Ok(request)
        }
        Decision::Forbidden(reason) if reason.is_credential_failure() => {
            warn!(namespace_id, subject_id = caller.subject_id(), "{reason}");
            Err(ApiError::unauthorized(reason.message()).into_response())
        }
        Decision::Forbidden(reason) => {
            warn!(
                namespace_id,
                subject_id = caller.subject_id(),
                required = %gate.required,
                "access denied: {reason}"
            );
            Err(ApiError::forbidden(reason.message()).into_response())
        }
    }
}

/// Reads the target namespace from `?namespaceId=`, falling back to a
/// top-level `namespaceId` field of a JSON body. The body is put back
/// untouched for the handler.
async fn namespace_id_from_request(request: Request) -> Result<(Option<i64>, Request)> {
    if let Some(raw) = query_namespace_id(request.uri()) {
        return Ok((Some(parse_namespace_id(&raw)?), request));
    }

    if !matches!(*request.method(), Method::POST | Method::PUT) || !is_json(&request) {
        return Ok((None, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_PEEK_BYTES)
        .await
        .map_err(|e| Error::bad_input(format!("Failed to read request body: {e}")))?;

    let namespace_id = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(fields)) => fields
            .get(NAMESPACE_ID_PARAM)
            .map(namespace_id_from_json)
            .transpose()?,
        _ => None,
    };

    Ok((namespace_id, Request::from_parts(parts, Body::from(bytes))))
}

fn query_namespace_id(uri: &Uri) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(NAMESPACE_ID_PARAM)
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Accepts a namespace id given as a JSON number or string.
fn namespace_id_from_json(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(id) if id > 0 => Ok(id),
            _ => Err(Error::bad_input(format!(
                "Invalid namespace id '{n}': must be a positive integer"
            ))),
        },
        Value::String(s) => parse_namespace_id(s),
        other => Err(Error::bad_input(format!(
            "Invalid namespace id '{other}': must be a positive integer"
        ))),
    }
}
