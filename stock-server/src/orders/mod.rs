//! Orders: checkout assignment, self-assignment and status sync with carts

pub mod service;

pub use service::{OrderService, sync_order_with_cart};
pub(crate) use service::active_seller;
