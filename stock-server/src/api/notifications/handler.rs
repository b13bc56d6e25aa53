//! Notification API Handlers

use axum::{Json, extract::State};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::notify::Notification;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub removed: usize,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.inbox.list(user.id)))
}

/// DELETE /api/notifications
pub async fn clear(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ClearResult>> {
    let removed = state.inbox.clear(user.id);
    Ok(Json(ClearResult { removed }))
}
