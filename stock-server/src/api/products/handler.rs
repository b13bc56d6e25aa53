//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Product, ProductUpsert};

use crate::api::blocking;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    let product = blocking(move || state.stock.get_product(id)).await?;
    Ok(Json(product))
}

/// PUT /api/products/{id}
pub async fn upsert(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpsert>,
) -> AppResult<Json<Product>> {
    let product = blocking(move || state.stock.upsert_product(id, payload)).await?;
    tracing::info!(product_id = id, "Product saved");
    Ok(Json(product))
}
