use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::NamespaceContext;
use crate::server::dto::GrantMembershipRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Role;

pub async fn list_members(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let members = state.namespaces.members(ctx.namespace_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

/// Grants a role. A user who is already a member keeps their current role.
pub async fn add_member(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GrantMembershipRequest>,
) -> impl IntoResponse {
    let role: Role = req.role.parse()?;
    let membership = state.namespaces.grant(ctx.namespace_id, req.user_id, role)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(membership)))
}

pub async fn remove_member(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    state
        .namespaces
        .revoke(ctx.namespace_id, user_id, ctx.subject_id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
