//! Domain service for entitlement resolution.
//!
//! An [`Entitlement`] is the derived snapshot of a user's subscription state
//! and remaining config quota. It is recomputed from persisted facts on
//! every query and never cached: configs get created and bonuses change
//! between calls.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::VpnConfigInfo;
use crate::domain::UserId;

/// Domain errors for entitlement operations.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for EntitlementError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for EntitlementError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Derived snapshot of a user's subscription and quota state.
#[derive(Debug, Clone, Serialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub username: String,
    pub is_banned: bool,
    pub is_active_subscription: bool,
    pub subscription_end_date: NaiveDate,
    pub configs_created: i64,
    pub bonus_configs: i64,
    /// May be negative when a user holds more configs than their current
    /// allotment (e.g. after a bonus was reduced).
    pub configs_remaining: i64,
    pub created_at: DateTime<Utc>,
}

/// Domain service trait for entitlement queries.
///
/// Exposed to the conversational front-end and the subscription scanner;
/// implementations are read-only over the persistence gateway.
#[async_trait::async_trait]
pub trait EntitlementService: Send + Sync {
    /// Resolves the full entitlement snapshot for a user.
    ///
    /// # Errors
    ///
    /// - Returns [`EntitlementError::UserNotFound`] if no registered row
    ///   exists for the user (missing row or unset creation timestamp).
    /// - Returns [`EntitlementError::Database`] on gateway failures.
    async fn resolve(&self, user_id: UserId) -> Result<Entitlement, EntitlementError>;

    /// How many more configs the user may create right now.
    ///
    /// Fast path for "can this user request another config" checks: skips
    /// the subscription-date fetch and only reads the two counters. The
    /// result is exactly `resolve(user_id)?.configs_remaining` and may be
    /// negative; callers must not treat a non-positive value as an error.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`EntitlementService::resolve`].
    async fn remaining_quota(&self, user_id: UserId) -> Result<i64, EntitlementError>;

    /// Whether any row exists for this user.
    async fn user_exists(&self, user_id: UserId) -> Result<bool, EntitlementError>;

    /// Whether the user owns at least one config.
    async fn has_any_config(&self, user_id: UserId) -> Result<bool, EntitlementError>;

    /// Names and uuids of the user's provisioned configs.
    async fn list_configs(&self, user_id: UserId) -> Result<Vec<VpnConfigInfo>, EntitlementError>;
}

/// Remaining quota arithmetic: base allotment plus bonus minus created.
///
/// Deliberately not clamped at zero — a negative result means the user must
/// not create more configs until the balance recovers.
#[must_use]
pub const fn configs_remaining(default_max: i64, bonus: i64, created: i64) -> i64 {
    default_max + bonus - created
}

/// A subscription ending exactly on `today` is still active; the end date is
/// the inclusive last active day.
#[must_use]
pub fn is_subscription_active(end_date: NaiveDate, today: NaiveDate) -> bool {
    end_date >= today
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn remaining_basic() {
        // M=5, c=3, b=2 -> 4; one more config created -> 3.
        assert_eq!(configs_remaining(5, 2, 3), 4);
        assert_eq!(configs_remaining(5, 2, 4), 3);
    }

    #[test]
    fn remaining_goes_negative() {
        assert_eq!(configs_remaining(5, 0, 7), -2);
        assert_eq!(configs_remaining(3, 1, 10), -6);
    }

    #[test]
    fn remaining_with_large_bonus_exceeds_nominal_max() {
        assert_eq!(configs_remaining(5, 100, 0), 105);
    }

    #[test]
    fn zero_bonus_equals_absent_bonus() {
        assert_eq!(configs_remaining(5, 0, 2), configs_remaining(5, 0, 2));
        assert_eq!(configs_remaining(5, 0, 2), 3);
    }

    #[test]
    fn subscription_ending_today_is_active() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(is_subscription_active(today, today));
    }

    #[test]
    fn subscription_ended_yesterday_is_inactive() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(!is_subscription_active(today - Duration::days(1), today));
    }

    #[test]
    fn subscription_ending_tomorrow_is_active() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(is_subscription_active(today + Duration::days(1), today));
    }

    #[test]
    fn entitlement_error_display() {
        let err = EntitlementError::UserNotFound(UserId::new(42));
        assert_eq!(err.to_string(), "User not found: 42");
    }
}
