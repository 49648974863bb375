//! Coupon quota tracking
//!
//! This module provides usage enforcement for coupon codes:
//! - Global redemption cap across all users
//! - Per-user caps over all time, one UTC day and one ISO week
//! - Atomic evaluate-then-count redemption per coupon

pub mod engine;
pub mod registry;
pub mod types;
pub mod window;

pub use engine::QuotaEngine;
pub use registry::{CouponHandle, CouponRegistry};
pub use types::{Coupon, LimitRule, LimitScope, Outcome, StatusCategory, UserUsage};
pub use window::{DayKey, WeekKey};
