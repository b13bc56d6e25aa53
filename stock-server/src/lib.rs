//! Stock Server - wholesale inventory reservation and checkout
//!
//! # Overview
//!
//! - **Ledger** (`inventory`): per-location stock records in redb, with
//!   reservations, capped totals and an append-only movement log
//! - **Carts** (`carts`): state machine, line editing, commit on checkout and
//!   expiry of unpaid carts
//! - **Assignment** (`assignment`, `orders`): shift-aware round-robin of
//!   orders over active sellers
//! - **HTTP API** (`api`): axum routes behind JWT authentication
//!
//! # Layout
//!
//! ```text
//! stock-server/src/
//! ├── core/          # config, state, background tasks, server
//! ├── auth/          # JWT validation, role gates
//! ├── inventory/     # storage, ledger, reservations, commit engine
//! ├── carts/         # state machine, cart service, expiry sweeper
//! ├── assignment/    # working hours, round-robin scheduler, roster
//! ├── orders/        # orders derived from carts
//! ├── pricing/       # quantity tiers
//! ├── notify/        # post-commit notifications
//! ├── api/           # HTTP handlers
//! └── utils/         # logging, time, validation
//! ```

pub mod api;
pub mod assignment;
pub mod auth;
pub mod carts;
pub mod core;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod pricing;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use inventory::{InventoryError, InventoryStore};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - structured fields on the `security` target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env`, prepare the work dir and start logging
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
    let log_dir = std::path::Path::new(&work_dir).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR")
        .ok()
        .unwrap_or_else(|| log_dir.to_string_lossy().into_owned());
    init_logger_with_file(log_level.as_deref(), Some(&log_dir));
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __             __
  / ___// /_____  _____/ /__
  \__ \/ __/ __ \/ ___/ //_/
 ___/ / /_/ /_/ / /__/ ,<
/____/\__/\____/\___/_/|_|
    "#
    );
}
