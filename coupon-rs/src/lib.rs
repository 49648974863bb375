//! coupon-rs: Coupon redemption service with usage quotas
//!
//! Tracks and enforces how often promotional coupon codes may be redeemed.
//!
//! # Features
//!
//! - **Global cap**: total redemptions of a coupon across all users
//! - **Per-user caps**: all-time, per UTC day and per ISO-8601 week
//! - **Atomic redemption**: evaluation and counter updates run under the
//!   coupon's exclusive lock
//! - **REST API**: create, verify and apply coupons over HTTP
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use coupon_rs::config::LimitsConfig;
//! use coupon_rs::coupon::{CouponRegistry, QuotaEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> coupon_rs::Result<()> {
//! let registry = Arc::new(CouponRegistry::new(LimitsConfig {
//!     global_total: Some(10),
//!     user_daily: Some(1),
//!     ..Default::default()
//! }));
//! registry.create_coupon("WELCOME10").await?;
//!
//! let engine = QuotaEngine::new(registry);
//! if engine.redeem("WELCOME10", Some("user1"), Utc::now()).await {
//!     println!("Coupon applied");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`coupon`]: Quota registry, engine and time windows
//! - [`api`]: HTTP transport

pub mod api;
pub mod config;
pub mod coupon;
pub mod error;

// Re-export commonly used types
pub use config::CouponConfig;
pub use error::{CouponError, Result};
