use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateNamespaceRequest, NamespaceFilter};
use crate::server::response::{ApiError, ApiResponse};

/// Lists the caller's namespaces, optionally only those called `?name=`.
pub async fn list_namespaces(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<NamespaceFilter>,
) -> impl IntoResponse {
    let namespaces = match filter.name.as_deref() {
        Some(name) => state.namespaces.find_for_subject(auth.user.id, name)?,
        None => state.namespaces.list_for_subject(auth.user.id)?,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(namespaces)))
}

pub async fn create_namespace(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamespaceRequest>,
) -> impl IntoResponse {
    let namespace =
        state
            .namespaces
            .create(&req.name, req.description.as_deref(), auth.user.id)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(namespace))))
}
