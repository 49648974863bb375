use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::registry::CouponRegistry;
use super::types::{Coupon, LimitScope, Outcome, UserUsage};
use super::window::{DayKey, WeekKey};

/// Evaluate every configured limit of `coupon` for `user` at `now`
///
/// Checks run in scope precedence and the first failure wins. Without a
/// user only the global limit applies.
pub fn check(coupon: &Coupon, user: Option<&str>, now: DateTime<Utc>) -> Outcome {
    if let Some(max) = coupon.limit(LimitScope::GlobalTotal) {
        if coupon.usage_count() >= max {
            return Outcome::GlobalLimitReached;
        }
    }

    let Some(user) = user else {
        return Outcome::Valid;
    };
    let empty = UserUsage::default();
    let usage = coupon.user_usage(user).unwrap_or(&empty);

    if let Some(max) = coupon.limit(LimitScope::UserTotal) {
        if usage.total() >= max {
            return Outcome::UserTotalLimitReached;
        }
    }

    let day = DayKey::from_instant(now);
    if let Some(max) = coupon.limit(LimitScope::UserDaily) {
        if usage.day_count(day) >= max {
            return Outcome::UserDailyLimitReached;
        }
    }

    if let Some(max) = coupon.limit(LimitScope::UserWeekly) {
        if usage.week_count(WeekKey::from(day)) >= max {
            return Outcome::UserWeeklyLimitReached;
        }
    }

    Outcome::Valid
}

/// Blank user ids count as anonymous
fn acting_user(user: Option<&str>) -> Option<&str> {
    user.filter(|u| !u.is_empty())
}

/// Quota evaluation and redemption over a [`CouponRegistry`]
#[derive(Clone)]
pub struct QuotaEngine {
    registry: Arc<CouponRegistry>,
}

impl QuotaEngine {
    pub fn new(registry: Arc<CouponRegistry>) -> Self {
        QuotaEngine { registry }
    }

    pub fn registry(&self) -> &Arc<CouponRegistry> {
        &self.registry
    }

    /// Decide whether `user` may redeem `code` at `now`. Never mutates.
    pub async fn evaluate(&self, code: &str, user: Option<&str>, now: DateTime<Utc>) -> Outcome {
        let user = acting_user(user);
        let outcome = match self.registry.lookup(code).await {
            Some(handle) => {
                let coupon = handle.read().await;
                check(&coupon, user, now)
            }
            None => Outcome::NotFound,
        };
        debug!("Evaluated coupon {} for {:?}: {:?}", code, user, outcome);
        outcome
    }

    /// Redeem `code`, returning the outcome that decided it
    ///
    /// Evaluation and counter updates happen under the coupon's write lock,
    /// so concurrent redemptions can never share the last remaining slot.
    pub async fn try_redeem(&self, code: &str, user: Option<&str>, now: DateTime<Utc>) -> Outcome {
        let user = acting_user(user);
        let Some(handle) = self.registry.lookup(code).await else {
            debug!("Redeem of unknown coupon {}", code);
            return Outcome::NotFound;
        };

        let mut coupon = handle.write().await;
        let outcome = check(&coupon, user, now);
        if !outcome.is_valid() {
            debug!("Rejected redemption of {} for {:?}: {:?}", code, user, outcome);
            return outcome;
        }

        coupon.record_redemption(user, now);
        info!(
            "Redeemed coupon {} for {:?} (global usage {})",
            code,
            user,
            coupon.usage_count()
        );
        outcome
    }

    /// Redeem `code`; `true` when the redemption was accepted and counted
    pub async fn redeem(&self, code: &str, user: Option<&str>, now: DateTime<Utc>) -> bool {
        self.try_redeem(code, user, now).await.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn test_limits() -> LimitsConfig {
        LimitsConfig {
            global_total: Some(10),
            user_total: Some(3),
            user_daily: Some(1),
            user_weekly: Some(2),
        }
    }

    async fn engine_with(limits: LimitsConfig, code: &str) -> QuotaEngine {
        let registry = Arc::new(CouponRegistry::new(limits));
        registry.create_coupon(code).await.unwrap();
        QuotaEngine::new(registry)
    }

    #[tokio::test]
    async fn test_evaluate_unknown_coupon() {
        let engine = engine_with(test_limits(), "TEST123").await;
        assert_eq!(engine.evaluate("INVALID", None, at(2023, 1, 2)).await, Outcome::NotFound);
        assert!(!engine.redeem("INVALID", Some("user1"), at(2023, 1, 2)).await);
    }

    #[tokio::test]
    async fn test_evaluate_valid_with_and_without_user() {
        let engine = engine_with(test_limits(), "TEST123").await;
        assert_eq!(engine.evaluate("TEST123", None, at(2023, 1, 2)).await, Outcome::Valid);
        assert_eq!(
            engine.evaluate("TEST123", Some("user1"), at(2023, 1, 2)).await,
            Outcome::Valid
        );
    }

    #[tokio::test]
    async fn test_evaluate_does_not_mutate() {
        let engine = engine_with(test_limits(), "TEST123").await;
        let now = at(2023, 1, 2);
        for _ in 0..5 {
            assert_eq!(engine.evaluate("TEST123", Some("user1"), now).await, Outcome::Valid);
        }

        let coupon = engine.registry().snapshot("TEST123").await.unwrap();
        assert_eq!(coupon.usage_count(), 0);
        assert!(coupon.user_usage("user1").is_none());
    }

    #[tokio::test]
    async fn test_daily_limit_same_day() {
        let engine = engine_with(test_limits(), "TEST123").await;
        let now = at(2023, 1, 2);

        assert!(engine.redeem("TEST123", Some("user1"), now).await);
        assert_eq!(
            engine.try_redeem("TEST123", Some("user1"), now).await,
            Outcome::UserDailyLimitReached
        );

        let coupon = engine.registry().snapshot("TEST123").await.unwrap();
        assert_eq!(coupon.usage_count(), 1);
        assert_eq!(coupon.user_usage("user1").unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_global_limit_checked_before_user_limits() {
        let limits = LimitsConfig {
            global_total: Some(1),
            user_daily: Some(1),
            ..Default::default()
        };
        let engine = engine_with(limits, "ONE").await;
        let now = at(2023, 1, 2);

        assert!(engine.redeem("ONE", Some("user1"), now).await);
        // user1 would also fail the daily check, but global wins
        assert_eq!(
            engine.evaluate("ONE", Some("user1"), now).await,
            Outcome::GlobalLimitReached
        );
        assert_eq!(engine.evaluate("ONE", None, now).await, Outcome::GlobalLimitReached);
    }

    #[tokio::test]
    async fn test_user_total_checked_before_daily() {
        let limits = LimitsConfig {
            user_total: Some(1),
            user_daily: Some(1),
            ..Default::default()
        };
        let engine = engine_with(limits, "ORDER").await;
        let now = at(2023, 1, 2);

        assert!(engine.redeem("ORDER", Some("user1"), now).await);
        assert_eq!(
            engine.evaluate("ORDER", Some("user1"), now).await,
            Outcome::UserTotalLimitReached
        );
    }

    #[tokio::test]
    async fn test_anonymous_skips_user_limits() {
        let limits = LimitsConfig {
            user_total: Some(1),
            user_daily: Some(1),
            user_weekly: Some(1),
            ..Default::default()
        };
        let engine = engine_with(limits, "ANON").await;
        let now = at(2023, 1, 2);

        for _ in 0..5 {
            assert!(engine.redeem("ANON", None, now).await);
        }
        // empty user ids are anonymous too
        assert!(engine.redeem("ANON", Some(""), now).await);

        let coupon = engine.registry().snapshot("ANON").await.unwrap();
        assert_eq!(coupon.usage_count(), 6);
        assert!(coupon.users().is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_rejects_first_attempt() {
        let limits = LimitsConfig {
            user_weekly: Some(0),
            ..Default::default()
        };
        let engine = engine_with(limits, "ZERO").await;
        assert_eq!(
            engine.try_redeem("ZERO", Some("user1"), at(2023, 1, 2)).await,
            Outcome::UserWeeklyLimitReached
        );
        assert!(engine.redeem("ZERO", None, at(2023, 1, 2)).await);
    }

    #[tokio::test]
    async fn test_unbounded_coupon() {
        let engine = engine_with(LimitsConfig::default(), "FREE").await;
        for _ in 0..50 {
            assert!(engine.redeem("FREE", Some("user1"), at(2023, 1, 2)).await);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeem_respects_global_limit() {
        let limits = LimitsConfig {
            global_total: Some(5),
            ..Default::default()
        };
        let engine = engine_with(limits, "RACE").await;
        let now = at(2023, 1, 2);

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let user = format!("user{}", i);
                    engine.redeem("RACE", Some(user.as_str()), now).await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 5);
        let coupon = engine.registry().snapshot("RACE").await.unwrap();
        assert_eq!(coupon.usage_count(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_redeem_respects_per_user_limits() {
        let limits = LimitsConfig {
            global_total: Some(3),
            user_total: Some(1),
            user_daily: Some(1),
            ..Default::default()
        };
        let now = at(2023, 1, 2);

        for round in 0..10 {
            let code = format!("SHARED{}", round);
            let engine = engine_with(limits, &code).await;

            let tasks: Vec<_> = (0..64)
                .map(|i| {
                    let engine = engine.clone();
                    let code = code.clone();
                    tokio::spawn(async move {
                        let user = if i % 2 == 0 { "user1" } else { "user2" };
                        engine.redeem(&code, Some(user), now).await
                    })
                })
                .collect();

            let mut accepted = 0;
            for task in tasks {
                if task.await.unwrap() {
                    accepted += 1;
                }
            }

            assert_eq!(accepted, 2);
            let coupon = engine.registry().snapshot(&code).await.unwrap();
            assert_eq!(coupon.usage_count(), 2);
            for user in ["user1", "user2"] {
                let usage = coupon.user_usage(user).unwrap();
                assert_eq!(usage.total(), 1);
                assert_eq!(usage.day_count(DayKey::from_instant(now)), 1);
            }
        }
    }
}
