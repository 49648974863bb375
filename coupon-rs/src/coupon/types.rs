use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::window::{DayKey, WeekKey};
use crate::config::LimitsConfig;

/// Dimension a limit applies to
///
/// Declaration order is the evaluation precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    /// All redemptions by anyone, all time
    GlobalTotal,
    /// One user, all time
    UserTotal,
    /// One user, one UTC calendar day
    UserDaily,
    /// One user, one ISO-8601 week
    UserWeekly,
}

impl LimitScope {
    pub const ALL: [LimitScope; 4] = [
        LimitScope::GlobalTotal,
        LimitScope::UserTotal,
        LimitScope::UserDaily,
        LimitScope::UserWeekly,
    ];
}

/// A ceiling for one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    pub scope: LimitScope,
    pub max: u64,
}

impl LimitRule {
    /// Build the rule set for a new coupon, skipping unset scopes
    pub fn from_limits(limits: &LimitsConfig) -> Vec<LimitRule> {
        LimitScope::ALL
            .into_iter()
            .filter_map(|scope| {
                let max = match scope {
                    LimitScope::GlobalTotal => limits.global_total,
                    LimitScope::UserTotal => limits.user_total,
                    LimitScope::UserDaily => limits.user_daily,
                    LimitScope::UserWeekly => limits.user_weekly,
                };
                max.map(|max| LimitRule { scope, max })
            })
            .collect()
    }
}

/// Redemption counters for one (coupon, user) pair
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUsage {
    total: u64,
    day_buckets: BTreeMap<DayKey, u64>,
    week_buckets: BTreeMap<WeekKey, u64>,
}

impl UserUsage {
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn day_count(&self, day: DayKey) -> u64 {
        self.day_buckets.get(&day).copied().unwrap_or(0)
    }

    pub fn week_count(&self, week: WeekKey) -> u64 {
        self.week_buckets.get(&week).copied().unwrap_or(0)
    }

    pub fn day_buckets(&self) -> &BTreeMap<DayKey, u64> {
        &self.day_buckets
    }

    pub fn week_buckets(&self) -> &BTreeMap<WeekKey, u64> {
        &self.week_buckets
    }

    /// Count one redemption at `now` in every counter
    pub(crate) fn record(&mut self, now: DateTime<Utc>) {
        let day = DayKey::from_instant(now);
        self.total += 1;
        *self.day_buckets.entry(day).or_insert(0) += 1;
        *self.week_buckets.entry(WeekKey::from(day)).or_insert(0) += 1;
    }

    /// Drop buckets older than `weeks` weeks before `now`. Returns the number removed.
    ///
    /// `weeks` must be at least 1 so the current day and week survive. The
    /// running total is never touched.
    pub(crate) fn prune(&mut self, now: DateTime<Utc>, weeks: u32) -> usize {
        let Some(cutoff) = DayKey::from_instant(now).weeks_before(weeks.max(1)) else {
            return 0;
        };
        let before = self.day_buckets.len() + self.week_buckets.len();

        self.day_buckets = self.day_buckets.split_off(&cutoff);
        self.week_buckets = self.week_buckets.split_off(&WeekKey::from(cutoff));

        before - self.day_buckets.len() - self.week_buckets.len()
    }
}

/// A redeemable code with its rules and live counters
#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    code: String,
    rules: Vec<LimitRule>,
    usage_count: u64,
    users: HashMap<String, UserUsage>,
}

impl Coupon {
    /// New coupon with zero counters and the given limits snapshotted
    pub fn new(code: impl Into<String>, limits: &LimitsConfig) -> Self {
        Self {
            code: code.into(),
            rules: LimitRule::from_limits(limits),
            usage_count: 0,
            users: HashMap::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn rules(&self) -> &[LimitRule] {
        &self.rules
    }

    /// Configured maximum for a scope, `None` when the scope is unbounded
    pub fn limit(&self, scope: LimitScope) -> Option<u64> {
        self.rules.iter().find(|r| r.scope == scope).map(|r| r.max)
    }

    /// Global redemptions, all users and anonymous
    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn user_usage(&self, user: &str) -> Option<&UserUsage> {
        self.users.get(user)
    }

    pub fn users(&self) -> &HashMap<String, UserUsage> {
        &self.users
    }

    /// Apply one accepted redemption. Callers must have evaluated first.
    pub(crate) fn record_redemption(&mut self, user: Option<&str>, now: DateTime<Utc>) {
        self.usage_count += 1;
        if let Some(user) = user {
            self.users.entry(user.to_string()).or_default().record(now);
        }
    }

    pub(crate) fn prune_buckets(&mut self, now: DateTime<Utc>, weeks: u32) -> usize {
        self.users
            .values_mut()
            .map(|usage| usage.prune(now, weeks))
            .sum()
    }
}

/// Coarse result class the transport maps onto its status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Ok,
    NotFound,
    Rejected,
}

/// Result of evaluating a coupon for a user at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    NotFound,
    GlobalLimitReached,
    UserTotalLimitReached,
    UserDailyLimitReached,
    UserWeeklyLimitReached,
    Valid,
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid)
    }

    pub fn category(&self) -> StatusCategory {
        match self {
            Outcome::Valid => StatusCategory::Ok,
            Outcome::NotFound => StatusCategory::NotFound,
            Outcome::GlobalLimitReached
            | Outcome::UserTotalLimitReached
            | Outcome::UserDailyLimitReached
            | Outcome::UserWeeklyLimitReached => StatusCategory::Rejected,
        }
    }

    /// Human-readable explanation
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::NotFound => "Coupon not found",
            Outcome::GlobalLimitReached => "Coupon usage limit has been reached",
            Outcome::UserTotalLimitReached => "User has reached the total usage limit for this coupon",
            Outcome::UserDailyLimitReached => "User has reached the daily usage limit for this coupon",
            Outcome::UserWeeklyLimitReached => "User has reached the weekly usage limit for this coupon",
            Outcome::Valid => "Coupon is valid",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
