//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{
    Cart, CartAddRequest, CartLineUpdate, CartStatusUpdate, CartSummary, CartTransfer, StockCheck,
};

use crate::api::blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/cart
pub async fn active(State(state): State<ServerState>, user: CurrentUser) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.active_cart(&user)).await?;
    Ok(Json(cart))
}

/// GET /api/cart/seller
pub async fn for_seller(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Cart>>> {
    let carts = blocking(move || state.carts.carts_for_seller(&user)).await?;
    Ok(Json(carts))
}

/// GET /api/cart/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.get_cart(&user, id)).await?;
    Ok(Json(cart))
}

/// POST /api/cart/add
pub async fn add(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CartAddRequest>,
) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.add_line(&user, payload)).await?;
    Ok(Json(cart))
}

/// PUT /api/cart/update/{line_id}
pub async fn update_line(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(line_id): Path<i64>,
    Json(payload): Json<CartLineUpdate>,
) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.update_line(&user, line_id, payload)).await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/remove/{line_id}
pub async fn remove_line(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(line_id): Path<i64>,
) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.remove_line(&user, line_id)).await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/clear
pub async fn clear(State(state): State<ServerState>, user: CurrentUser) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.clear(&user)).await?;
    Ok(Json(cart))
}

/// GET /api/cart/check-stock
pub async fn check_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<StockCheck>> {
    let check = blocking(move || state.carts.check_stock(&user)).await?;
    Ok(Json(check))
}

/// GET /api/cart/summary
pub async fn summary(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<CartSummary>> {
    let summary = blocking(move || state.carts.summary(&user)).await?;
    Ok(Json(summary))
}

/// PUT /api/cart/{id}/status
///
/// `ready_for_payment` commits stock; failures come back as 400 with the
/// product, location and quantities in `details`.
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CartStatusUpdate>,
) -> AppResult<Json<Cart>> {
    let cart = blocking(move || state.carts.update_status(&user, id, payload.state)).await?;
    Ok(Json(cart))
}

/// POST /api/cart/{id}/transfer
pub async fn transfer(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CartTransfer>,
) -> AppResult<Json<Cart>> {
    let cart =
        blocking(move || state.carts.transfer_to_seller(&user, id, payload.vendor_id)).await?;
    Ok(Json(cart))
}
