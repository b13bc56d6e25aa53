//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{Order, OrderAssign, OrderStatus};

use crate::api::blocking;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
}

/// GET /api/orders
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = blocking(move || state.orders.list(&user, query.status)).await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = blocking(move || state.orders.get(&user, id)).await?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/assign-self
pub async fn assign_self(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = blocking(move || state.orders.assign_self(&user, id)).await?;
    Ok(Json(order))
}

/// PUT /api/orders/{id}/assign
pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<OrderAssign>,
) -> AppResult<Json<Order>> {
    let order = blocking(move || state.orders.assign_to(&user, id, payload.seller_id)).await?;
    Ok(Json(order))
}
