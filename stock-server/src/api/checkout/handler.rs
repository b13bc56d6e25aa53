//! Checkout API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{AssignmentResponse, Order};

use crate::api::blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// POST /api/checkout/{cart_id}/request-assignment
///
/// Never fails for lack of sellers: the response then reports
/// `pending: true` and administrators are notified.
pub async fn request_assignment(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(cart_id): Path<i64>,
) -> AppResult<Json<AssignmentResponse>> {
    let response = blocking(move || state.orders.request_assignment(&user, cart_id)).await?;
    Ok(Json(response))
}

/// POST /api/checkout/{cart_id}
///
/// Direct checkout by the seller the cart is assigned to.
pub async fn checkout(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(cart_id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = blocking(move || state.orders.checkout(&user, cart_id)).await?;
    Ok(Json(order))
}
