use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use tracing::info;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

/// Runs one retention sweep immediately and returns its report.
pub async fn run_sweep(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("manual retention sweep requested");

    let sweeper = Arc::clone(&state.sweeper);
    let report = tokio::task::spawn_blocking(move || sweeper.run_once())
        .await
        .map_err(|e| ApiError::internal(format!("Sweep task failed: {e}")))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(report)))
}
