//! Shared types for the stock server
//!
//! Domain models exchanged over the API and persisted in the ledger store,
//! plus the unified error system and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
