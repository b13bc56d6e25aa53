//! HTTP API
//!
//! - [`health`] - liveness, drift counter and last sweep (public)
//! - [`cart`] - cart editing and state changes
//! - [`checkout`] - order creation and seller assignment
//! - [`orders`] - order lookup and (self-)assignment
//! - [`stock`] - stock administration (admin)
//! - [`products`] - ledger-relevant product attributes
//! - [`staff`] - seller and administrator roster
//! - [`pricing`] - quantity price tiers
//! - [`notifications`] - per-user inbox

pub mod cart;
pub mod checkout;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod staff;
pub mod stock;

use crate::inventory::InventoryResult;
use crate::utils::{AppError, AppResult};

/// Run ledger work on the blocking pool
///
/// redb transactions are synchronous and may wait on the writer gate, so
/// they never run on the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> InventoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Blocking task failed: {}", e)))?
        .map_err(AppError::from)
}
