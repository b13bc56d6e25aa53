//! Cart API
//!
//! | Path | Method | Caller |
//! |------|--------|--------|
//! | /api/cart | GET | active cart (created on first use) |
//! | /api/cart/add | POST | add or merge a line |
//! | /api/cart/update/{line_id} | PUT | quantity, location, stock confirmation |
//! | /api/cart/remove/{line_id} | DELETE | remove a line |
//! | /api/cart/clear | DELETE | empty the active cart |
//! | /api/cart/check-stock | GET | availability report |
//! | /api/cart/summary | GET | tier pricing of the active cart |
//! | /api/cart/seller | GET | carts assigned to the calling seller (staff) |
//! | /api/cart/{id} | GET | owner, vendor or admin |
//! | /api/cart/{id}/status | PUT | state machine transition |
//! | /api/cart/{id}/transfer | POST | hand a draft to a seller |

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<ServerState> {
    let seller_routes = Router::new()
        .route("/seller", get(handler::for_seller))
        .layer(middleware::from_fn(require_staff));

    Router::new()
        .route("/", get(handler::active))
        .route("/add", post(handler::add))
        .route("/update/{line_id}", put(handler::update_line))
        .route("/remove/{line_id}", delete(handler::remove_line))
        .route("/clear", delete(handler::clear))
        .route("/check-stock", get(handler::check_stock))
        .route("/summary", get(handler::summary))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/transfer", post(handler::transfer))
        .merge(seller_routes)
}
