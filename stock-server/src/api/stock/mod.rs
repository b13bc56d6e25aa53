//! Stock administration API (admin only)
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /api/stock/{product_id} | GET | records of a product |
//! | /api/stock/{product_id}/movements | GET | movement log |
//! | /api/stock/{product_id}/{variant_id}/{location} | PUT | set absolute stock |
//! | /api/stock/{product_id}/{variant_id}/{location} | DELETE | soft-delete |
//! | /api/stock/transfer | POST | move units between locations |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/stock", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/transfer", post(handler::transfer))
        .route("/{product_id}", get(handler::list))
        .route("/{product_id}/movements", get(handler::movements))
        .route(
            "/{product_id}/{variant_id}/{location}",
            put(handler::set_stock).delete(handler::soft_delete),
        )
        .layer(middleware::from_fn(require_admin))
}
