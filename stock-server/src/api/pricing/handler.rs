//! Pricing API Handlers

use axum::{Json, extract::State};
use shared::models::PriceTier;

use crate::api::blocking;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/pricing/tiers
pub async fn list_tiers(State(state): State<ServerState>) -> AppResult<Json<Vec<PriceTier>>> {
    let tiers = blocking(move || state.pricing.tiers()).await?;
    Ok(Json(tiers))
}

/// PUT /api/pricing/tiers
pub async fn replace_tiers(
    State(state): State<ServerState>,
    Json(payload): Json<Vec<PriceTier>>,
) -> AppResult<Json<Vec<PriceTier>>> {
    let tiers = blocking(move || state.pricing.replace_tiers(payload)).await?;
    Ok(Json(tiers))
}
