//! Staff API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{StaffMember, StaffUpsert};

use crate::api::blocking;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/staff
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<StaffMember>>> {
    let staff = blocking(move || state.roster.list()).await?;
    Ok(Json(staff))
}

/// PUT /api/staff/{id}
pub async fn upsert(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<StaffUpsert>,
) -> AppResult<Json<StaffMember>> {
    let member = blocking(move || state.roster.upsert(id, payload)).await?;
    Ok(Json(member))
}
