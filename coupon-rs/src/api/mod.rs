//! REST API module for coupon-rs
//!
//! Provides HTTP endpoints for creating, verifying and applying coupons

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{router, ApiServer};
