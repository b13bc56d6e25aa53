//! Carts: state machine, line editing, commit on checkout and expiry

pub mod expiry;
pub mod machine;
pub mod service;

pub use expiry::{ExpirySweeper, SweepReport, SweepSnapshot, SweepStats};
pub use service::CartService;
