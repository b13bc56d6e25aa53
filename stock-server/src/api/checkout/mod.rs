//! Checkout API
//!
//! | Path | Method | Who | Meaning |
//! |------|--------|-----|---------|
//! | /api/checkout/{cart_id} | POST | assigned seller | commit confirmed lines, finalize the cart, complete the order |
//! | /api/checkout/{cart_id}/request-assignment | POST | cart owner | create the order and hand it to the next seller |

mod handler;

use axum::{Router, middleware, routing::post};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", routes())
}

fn routes() -> Router<ServerState> {
    let customer_routes = Router::new().route(
        "/{cart_id}/request-assignment",
        post(handler::request_assignment),
    );

    let seller_routes = Router::new()
        .route("/{cart_id}", post(handler::checkout))
        .layer(middleware::from_fn(require_staff));

    customer_routes.merge(seller_routes)
}
