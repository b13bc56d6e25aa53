//! Product API
//!
//! Only the attributes the ledger needs: name, cost price, stock cap.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new().route("/{id}", get(handler::get_by_id));

    let manage_routes = Router::new()
        .route("/{id}", put(handler::upsert))
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(manage_routes)
}
