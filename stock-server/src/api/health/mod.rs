//! Health check routes (public)
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /health | GET | liveness, drift counter, last expiry sweep |
//! | /health/detailed | GET | adds uptime and store statistics |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "ledger_drift_events": 0,
//!   "expiry_sweep": { "last_run_at": 1760000000000, "last_report": { "expired": 1, ... } }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::carts::SweepSnapshot;
use crate::core::ServerState;
use crate::inventory::StorageStats;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Reservation releases clamped since start
    ledger_drift_events: u64,
    expiry_sweep: SweepSnapshot,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    health: HealthResponse,
    uptime_seconds: u64,
    /// Store read latency
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StorageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Pin the uptime origin; otherwise the first health call sets it
pub fn mark_started() {
    START_TIME.get_or_init(Instant::now);
}

fn uptime() -> Duration {
    START_TIME.get_or_init(Instant::now).elapsed()
}

fn summary(state: &ServerState) -> HealthResponse {
    HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ledger_drift_events: state.store.drift_count(),
        expiry_sweep: state.sweep_stats.snapshot(),
    }
}

/// GET /health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(summary(&state))
}

/// GET /health/detailed
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let mut health = summary(&state);
    let uptime_seconds = uptime().as_secs();

    let started = Instant::now();
    let store = state.store.clone();
    let stats = tokio::task::spawn_blocking(move || store.get_stats()).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (store, error) = match stats {
        Ok(Ok(stats)) => (Some(stats), None),
        Ok(Err(e)) => (None, Some(e.to_string())),
        Err(e) => (None, Some(e.to_string())),
    };
    if error.is_some() {
        health.status = "error";
    }

    Json(DetailedHealthResponse {
        health,
        uptime_seconds,
        latency_ms,
        store,
        error,
    })
}
