use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::NamespaceContext;
use crate::server::dto::{CreateKeyRequest, KeyValueResponse, UpdateKeyRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_keys(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let keys = state.keys.list(ctx.namespace_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(keys)))
}

pub async fn create_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateKeyRequest>,
) -> impl IntoResponse {
    let key = state.keys.create(ctx.namespace_id, &req.name, &req.value)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(key))))
}

pub async fn get_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let key = state.keys.get(ctx.namespace_id, &name)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(key)))
}

pub async fn get_value(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let key = state.keys.get(ctx.namespace_id, &name)?;

    let (Some(value), Some(revision_number)) = (key.current_value, key.current_revision_number)
    else {
        return Err(ApiError::not_found(format!("Key '{name}' has no current value")));
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(KeyValueResponse {
        name: key.name,
        value,
        revision_number,
    })))
}

/// Writes a new revision and makes it current.
pub async fn update_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<UpdateKeyRequest>,
) -> impl IntoResponse {
    let key = state.keys.add_revision(ctx.namespace_id, &name, &req.value)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(key)))
}

pub async fn delete_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if !state.keys.soft_delete(ctx.namespace_id, &name)? {
        return Err(ApiError::not_found(format!("Key '{name}' not found")));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn restore_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if !state.keys.restore(ctx.namespace_id, &name)? {
        return Err(ApiError::not_found(format!(
            "No deleted key named '{name}'"
        )));
    }
    let key = state.keys.get(ctx.namespace_id, &name)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(key)))
}

pub async fn revert_key(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path((name, revision)): Path<(String, i64)>,
) -> impl IntoResponse {
    let key = state.keys.revert(ctx.namespace_id, &name, revision)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(key)))
}

pub async fn get_history(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let revisions = state.keys.history(ctx.namespace_id, &name)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(revisions)))
}

pub async fn get_revision(
    Extension(ctx): Extension<NamespaceContext>,
    State(state): State<Arc<AppState>>,
    Path((name, revision)): Path<(String, i64)>,
) -> impl IntoResponse {
    let value = state.keys.value_at(ctx.namespace_id, &name, revision)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(KeyValueResponse {
        name,
        value,
        revision_number: revision,
    })))
}
