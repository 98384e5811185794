use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Duration;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, PaginationParams,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, paginate,
};

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let user = state.directory.create_user(&req.username)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let after_id = match params.cursor.as_deref() {
        Some(cursor) => cursor
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request("Invalid cursor"))?,
        None => 0,
    };

    let users = state.directory.list_users(after_id, DEFAULT_PAGE_SIZE + 1)?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.to_string());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let user = state.directory.get_user(id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    state.directory.soft_delete_user(id)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let expires_in = match req.expires_in_seconds {
        Some(seconds) if seconds <= 0 => {
            return Err(ApiError::bad_request(
                "expires_in_seconds must be positive",
            ));
        }
        Some(seconds) => Some(Duration::seconds(seconds)),
        None => None,
    };

    let issued = state.directory.issue_session_token(id, expires_in)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: issued.raw,
            metadata: issued.token.into(),
        })),
    ))
}
