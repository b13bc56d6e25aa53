//! Inventory core: stock ledger, reservations and commit
//!
//! All components share one [`InventoryStore`] handle and do their work
//! inside [`InventoryStore::write`] transactions.

pub mod admin;
pub mod commit;
pub mod error;
pub mod ledger;
pub mod reservation;
pub mod storage;

pub use admin::StockService;
pub use commit::CommitEngine;
pub use error::{InventoryError, InventoryResult};
pub use ledger::{MovementInfo, StockLedger};
pub use reservation::ReservationManager;
pub use storage::{InventoryStore, StorageError, StorageResult, StorageStats};
