//! Notification inbox API
//!
//! `GET /api/notifications` lists the caller's messages (newest first);
//! `DELETE /api/notifications` empties the inbox.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/notifications", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/", get(handler::list).delete(handler::clear))
}
