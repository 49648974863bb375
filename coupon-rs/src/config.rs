//! Configuration for coupon-rs
//!
//! Values are layered: built-in defaults, then the bare limit variables
//! (`GLOBAL_TOTAL_LIMIT`, `USER_TOTAL_LIMIT`, `USER_DAILY_LIMIT`,
//! `USER_WEEKLY_LIMIT`), then an optional TOML file, then environment
//! variables prefixed with `COUPON_` (nested keys separated by `__`, e.g.
//! `COUPON_LIMITS__USER_DAILY=1`).

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{CouponError, Result};

const ENV_PREFIX: &str = "COUPON";

/// Bare limit variables and the keys they seed
const LIMIT_VARS: [(&str, &str); 4] = [
    ("GLOBAL_TOTAL_LIMIT", "limits.global_total"),
    ("USER_TOTAL_LIMIT", "limits.user_total"),
    ("USER_DAILY_LIMIT", "limits.user_daily"),
    ("USER_WEEKLY_LIMIT", "limits.user_weekly"),
];

/// Main service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CouponConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Default limits snapshotted into newly created coupons
    pub limits: LimitsConfig,
    /// Day/week bucket retention
    pub retention: RetentionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:3000")
    pub listen_addr: String,
}

/// Usage limits, one per scope. `None` disables the check for that scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub global_total: Option<u64>,
    pub user_total: Option<u64>,
    pub user_daily: Option<u64>,
    pub user_weekly: Option<u64>,
}

/// Retention of per-user time buckets
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Buckets older than this many weeks are pruned (minimum 1)
    pub weeks: u32,
    /// Interval between retention sweeps in seconds (0 disables the sweep)
    pub interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Output format: "pretty" or "json"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            weeks: 2,
            interval_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl CouponConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Same as [`load`](Self::load), reading the bare limit variables through `lookup`
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = limit_var_defaults(config::Config::builder(), lookup)?;

        if let Some(path) = path {
            if !path.is_file() {
                return Err(CouponError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.listen_addr.parse::<SocketAddr>().map_err(|e| {
            CouponError::Config(format!(
                "Invalid listen address '{}': {}",
                self.server.listen_addr, e
            ))
        })?;

        if self.retention.weeks == 0 {
            return Err(CouponError::Config(
                "retention.weeks must be at least 1".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(CouponError::Config(format!(
                "Unknown logging format '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

/// Seed limit keys from the bare variables; every other source overrides them
fn limit_var_defaults<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LIMIT_VARS {
        let Some(raw) = lookup(var) else { continue };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let value: u64 = raw.parse().map_err(|_| {
            CouponError::Config(format!(
                "{} must be a non-negative integer, got '{}'",
                var, raw
            ))
        })?;
        builder = builder.set_default(key, value)?;
    }
    Ok(builder)
}
