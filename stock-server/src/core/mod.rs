//! Core - configuration, shared state, background tasks and the HTTP server
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - service handles shared by handlers
//! - [`BackgroundTasks`] - sweeper and dispatcher lifecycle
//! - [`Server`] - HTTP listener

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use server::{Server, build_app, build_router};
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
