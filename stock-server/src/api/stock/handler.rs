//! Stock API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shared::models::{StockKey, StockMovement, StockRecord, StockSet, StockTransfer};

use crate::api::blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct TransferResult {
    pub from: StockRecord,
    pub to: StockRecord,
}

/// GET /api/stock/{product_id}
pub async fn list(
    State(state): State<ServerState>,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Vec<StockRecord>>> {
    let records = blocking(move || state.stock.list(product_id)).await?;
    Ok(Json(records))
}

/// GET /api/stock/{product_id}/movements
pub async fn movements(
    State(state): State<ServerState>,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let movements = blocking(move || state.stock.movements(product_id)).await?;
    Ok(Json(movements))
}

/// PUT /api/stock/{product_id}/{variant_id}/{location}
pub async fn set_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((product_id, variant_id, location)): Path<(i64, i64, String)>,
    Json(payload): Json<StockSet>,
) -> AppResult<Json<StockRecord>> {
    let key = StockKey::new(product_id, variant_id, location);
    let record = blocking(move || {
        state
            .stock
            .set_stock(&key, payload.stock, payload.reason, user.id)
    })
    .await?;
    Ok(Json(record))
}

/// DELETE /api/stock/{product_id}/{variant_id}/{location}
pub async fn soft_delete(
    State(state): State<ServerState>,
    Path((product_id, variant_id, location)): Path<(i64, i64, String)>,
) -> AppResult<Json<StockRecord>> {
    let key = StockKey::new(product_id, variant_id, location);
    let record = blocking(move || state.stock.soft_delete(&key)).await?;
    Ok(Json(record))
}

/// POST /api/stock/transfer
pub async fn transfer(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<StockTransfer>,
) -> AppResult<Json<TransferResult>> {
    let (from, to) = blocking(move || state.stock.transfer(&payload, user.id)).await?;
    Ok(Json(TransferResult { from, to }))
}
