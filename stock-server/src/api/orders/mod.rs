//! Order API
//!
//! | Path | Method | Caller |
//! |------|--------|--------|
//! | /api/orders?status= | GET | visible orders |
//! | /api/orders/{id} | GET | owner, assignee, sellers (unassigned), admins |
//! | /api/orders/{id}/assign-self | POST | seller |
//! | /api/orders/{id}/assign | PUT | admin |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::{require_admin, require_staff};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id));

    let seller_routes = Router::new()
        .route("/{id}/assign-self", post(handler::assign_self))
        .layer(middleware::from_fn(require_staff));

    let admin_routes = Router::new()
        .route("/{id}/assign", put(handler::assign))
        .layer(middleware::from_fn(require_admin));

    read_routes.merge(seller_routes).merge(admin_routes)
}
