//! Pricing API
//!
//! `GET /api/pricing/tiers` for everyone, `PUT` (whole list) for admins.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/pricing", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new().route("/tiers", get(handler::list_tiers));

    let manage_routes = Router::new()
        .route("/tiers", put(handler::replace_tiers))
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(manage_routes)
}
