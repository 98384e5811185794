use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub async fn get_current_user(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}

/// Soft-deletes the caller. Their session tokens stop working immediately.
pub async fn delete_current_user(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.directory.soft_delete_user(auth.user.id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
