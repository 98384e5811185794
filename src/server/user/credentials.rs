use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::dto::CreateCredentialRequest;
use crate::server::{AppState, NamespaceContext};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Role;

/// Issues an API key for the gated namespace. The secret is only ever
/// returned here. API keys cannot mint further keys.
pub async fn create_credential(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<NamespaceContext>,
    Json(req): Json<CreateCredentialRequest>,
) -> impl IntoResponse {
    let role: Role = req.role.parse()?;

    let issued = state.credentials.issue(
        auth.user.id,
        ctx.namespace_id,
        role,
        req.description.as_deref(),
        req.ttl_days,
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(issued))))
}

pub async fn list_credentials(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let credentials = state.credentials.list(auth.user.id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(credentials)))
}

pub async fn revoke_credential(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    state.credentials.revoke(auth.user.id, id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
