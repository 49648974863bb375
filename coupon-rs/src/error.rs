//! Error types for coupon-rs

use thiserror::Error;

/// Result type alias for coupon operations
pub type Result<T> = std::result::Result<T, CouponError>;

/// Coupon error types
///
/// Quota rejections are not errors; they are reported as
/// [`Outcome`](crate::coupon::Outcome) values.
#[derive(Error, Debug)]
pub enum CouponError {
    /// A coupon with this code already exists
    #[error("Coupon code '{0}' already exists")]
    Duplicate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
