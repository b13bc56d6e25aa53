//! Staff API
//!
//! `GET /api/staff` (sellers and admins), `PUT /api/staff/{id}` (admin).

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::{require_admin, require_staff};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/staff", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .layer(middleware::from_fn(require_staff));

    let manage_routes = Router::new()
        .route("/{id}", put(handler::upsert))
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(manage_routes)
}
