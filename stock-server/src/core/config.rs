use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::auth::{JwtConfig, JwtError};
use crate::inventory::commit::DEFAULT_RESERVATION_WINDOW_MINUTES;
use crate::utils::time::parse_timezone;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | holds `inventory.redb` and `logs/` |
/// | HTTP_PORT | 3000 | HTTP listen port |
/// | ENVIRONMENT | development | development / staging / production |
/// | TIMEZONE | Europe/Madrid | business timezone for working hours |
/// | RESERVATION_WINDOW_MINUTES | 1440 | payment window after commit |
/// | EXPIRY_SWEEP_INTERVAL_SECS | 900 | expiry sweeper interval |
/// | LOCK_TIMEOUT_MS | 2000 | ledger writer gate timeout |
/// | NOTIFICATION_QUEUE_SIZE | 1024 | notification channel capacity |
/// | REQUEST_TIMEOUT_MS | 30000 | HTTP request timeout |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | graceful shutdown budget |
///
/// JWT settings are read by [`JwtConfig::from_env`].
///
/// ```ignore
/// WORK_DIR=/srv/stock HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    pub jwt: JwtConfig,
    /// development | staging | production
    pub environment: String,
    /// IANA name, e.g. `America/Argentina/Buenos_Aires`
    pub timezone: String,
    pub reservation_window_minutes: i64,
    pub expiry_sweep_interval_secs: u64,
    pub lock_timeout_ms: u64,
    pub notification_queue_size: usize,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, JwtError> {
        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_or("HTTP_PORT", 3000),
            jwt: JwtConfig::from_env()?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: std::env::var("TIMEZONE").unwrap_or_else(|_| "Europe/Madrid".into()),
            reservation_window_minutes: env_or(
                "RESERVATION_WINDOW_MINUTES",
                DEFAULT_RESERVATION_WINDOW_MINUTES,
            ),
            expiry_sweep_interval_secs: env_or("EXPIRY_SWEEP_INTERVAL_SECS", 900),
            lock_timeout_ms: env_or("LOCK_TIMEOUT_MS", 2000),
            notification_queue_size: env_or("NOTIFICATION_QUEUE_SIZE", 1024),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30_000),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10_000),
        })
    }

    /// Defaults with a fixed secret and work dir
    ///
    /// Used by tests and local tooling that must not depend on the
    /// process environment.
    pub fn with_overrides(work_dir: impl Into<String>, jwt: JwtConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 3000,
            jwt,
            environment: "development".into(),
            timezone: "Europe/Madrid".into(),
            reservation_window_minutes: DEFAULT_RESERVATION_WINDOW_MINUTES,
            expiry_sweep_interval_secs: 900,
            lock_timeout_ms: 2000,
            notification_queue_size: 1024,
            request_timeout_ms: 30_000,
            shutdown_timeout_ms: 10_000,
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.reservation_window_minutes <= 0 {
            return Err("RESERVATION_WINDOW_MINUTES must be positive".into());
        }
        if self.expiry_sweep_interval_secs == 0 {
            return Err("EXPIRY_SWEEP_INTERVAL_SECS must be positive".into());
        }
        if self.lock_timeout_ms == 0 {
            return Err("LOCK_TIMEOUT_MS must be positive".into());
        }
        if self.timezone.parse::<Tz>().is_err() {
            return Err(format!("TIMEZONE is not a known IANA zone: {}", self.timezone));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("inventory.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn business_timezone(&self) -> Tz {
        parse_timezone(&self.timezone)
    }

    pub fn reservation_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reservation_window_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
