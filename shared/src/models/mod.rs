//! Data models
//!
//! Shared between the stock server and its clients (via API).
//! All IDs are `i64`; quantities are `i64` validated non-negative at the edge.

pub mod cart;
pub mod order;
pub mod pricing;
pub mod product;
pub mod staff;
pub mod stock;

// Re-exports
pub use cart::*;
pub use order::*;
pub use pricing::*;
pub use product::*;
pub use staff::*;
pub use stock::*;
