use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::Coupon;
use crate::config::LimitsConfig;
use crate::error::{CouponError, Result};

/// Shared handle to one coupon; the write lock is the coupon's single-writer guard
pub type CouponHandle = Arc<RwLock<Coupon>>;

/// Registry of known coupons
///
/// Lock order: `limits`, then `coupons`, then a single coupon handle.
pub struct CouponRegistry {
    coupons: RwLock<HashMap<String, CouponHandle>>,
    limits: RwLock<LimitsConfig>,
}

impl CouponRegistry {
    /// Create an empty registry whose new coupons use `limits`
    pub fn new(limits: LimitsConfig) -> Self {
        CouponRegistry {
            coupons: RwLock::new(HashMap::new()),
            limits: RwLock::new(limits),
        }
    }

    /// Add a coupon with the currently configured limits
    pub async fn create_coupon(&self, code: &str) -> Result<()> {
        let limits = *self.limits.read().await;
        let mut coupons = self.coupons.write().await;

        match coupons.entry(code.to_string()) {
            Entry::Occupied(_) => {
                warn!("Rejected duplicate coupon code {}", code);
                Err(CouponError::Duplicate(code.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(Coupon::new(code, &limits))));
                info!(
                    "Created coupon {} (global_total={:?}, user_total={:?}, user_daily={:?}, user_weekly={:?})",
                    code, limits.global_total, limits.user_total, limits.user_daily, limits.user_weekly
                );
                Ok(())
            }
        }
    }

    /// Get the handle for a coupon
    pub async fn lookup(&self, code: &str) -> Option<CouponHandle> {
        self.coupons.read().await.get(code).cloned()
    }

    /// Get a point-in-time copy of a coupon
    pub async fn snapshot(&self, code: &str) -> Option<Coupon> {
        let handle = self.lookup(code).await?;
        let coupon = handle.read().await;
        Some(coupon.clone())
    }

    /// Limits that will be applied to coupons created from now on
    pub async fn limits(&self) -> LimitsConfig {
        *self.limits.read().await
    }

    /// Replace the limits for future coupons; existing coupons keep their own
    pub async fn set_limits(&self, limits: LimitsConfig) {
        *self.limits.write().await = limits;
        info!("Default coupon limits updated: {:?}", limits);
    }

    /// All coupon codes, sorted
    pub async fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.coupons.read().await.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Number of coupons
    pub async fn len(&self) -> usize {
        self.coupons.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.coupons.read().await.is_empty()
    }

    /// Remove day/week buckets older than `weeks` weeks from every coupon
    pub async fn prune_buckets(&self, now: DateTime<Utc>, weeks: u32) -> usize {
        let handles: Vec<CouponHandle> = self.coupons.read().await.values().cloned().collect();

        let mut removed = 0;
        for handle in handles {
            removed += handle.write().await.prune_buckets(now, weeks);
        }
        removed
    }

    /// Start the periodic bucket retention sweep
    pub fn start_retention_task(self: Arc<Self>, weeks: u32, interval: Duration) {
        tokio::spawn(async move {
            info!(
                "Starting bucket retention task (keep {} weeks, every {:?})",
                weeks, interval
            );
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                let removed = self.prune_buckets(Utc::now(), weeks).await;
                if removed > 0 {
                    info!("Retention sweep removed {} buckets", removed);
                } else {
                    debug!("Retention sweep removed nothing");
                }
            }
        });
    }
}

impl Default for CouponRegistry {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}
