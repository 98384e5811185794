use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::NamespaceContext;
use crate::server::dto::{AccessQuery, AccessResponse, NamespaceResponse, UpdateNamespaceRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Role;

pub async fn get_namespace(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let namespace = state.namespaces.get(ctx.namespace_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(NamespaceResponse {
        namespace,
        role: ctx.role,
    })))
}

/// Reports whether the caller's role in the namespace meets `?role=`.
pub async fn check_access(
    Extension(ctx): Extension<NamespaceContext>,
    Query(query): Query<AccessQuery>,
) -> impl IntoResponse {
    let required: Role = query.role.parse()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(AccessResponse {
        namespace_id: ctx.namespace_id,
        role: ctx.role,
        required,
        allowed: Role::sufficient(ctx.role, required),
    })))
}

pub async fn update_namespace(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateNamespaceRequest>,
) -> impl IntoResponse {
    let namespace =
        state
            .namespaces
            .rename(ctx.namespace_id, &req.name, req.description.as_deref())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(NamespaceResponse {
        namespace,
        role: ctx.role,
    })))
}

/// Soft-deletes the namespace together with its keys and API keys.
pub async fn delete_namespace(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.namespaces.soft_delete(ctx.namespace_id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
