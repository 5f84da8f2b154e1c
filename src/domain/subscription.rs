//! Derived subscription facts.
//!
//! Nothing here is persisted: expiry, remaining days and access are
//! recomputed from the stored dates on every read, with the current time
//! passed in explicitly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::enums::SubscriptionStatus;
use crate::models::Account;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessFacts {
    pub is_expired: bool,
    pub days_remaining: i64,
    pub can_access: bool,
}

/// First failing access condition, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenial {
    AccountDisabled,
    NoActiveSubscription,
    SubscriptionExpired,
}

impl AccessDenial {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::AccountDisabled => "Account is disabled",
            Self::NoActiveSubscription => "No active subscription",
            Self::SubscriptionExpired => "Subscription expired",
        }
    }
}

/// A subscription without an end date counts as expired.
#[must_use]
pub fn is_expired(account: &Account, now: DateTime<Utc>) -> bool {
    account
        .subscription_end_date
        .is_none_or(|end_date| now > end_date)
}

/// Whole days left, rounded up, never negative.
#[must_use]
pub fn days_remaining(account: &Account, now: DateTime<Utc>) -> i64 {
    let Some(end_date) = account.subscription_end_date else {
        return 0;
    };

    let remaining_ms = (end_date - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }

    (remaining_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

#[must_use]
pub fn can_access(account: &Account, now: DateTime<Utc>) -> bool {
    access_denial(account, now).is_none()
}

#[must_use]
pub fn access_denial(account: &Account, now: DateTime<Utc>) -> Option<AccessDenial> {
    if !account.is_active {
        Some(AccessDenial::AccountDisabled)
    } else if account.subscription_status != SubscriptionStatus::Active {
        Some(AccessDenial::NoActiveSubscription)
    } else if is_expired(account, now) {
        Some(AccessDenial::SubscriptionExpired)
    } else {
        None
    }
}

#[must_use]
pub fn is_expiring_soon(account: &Account, now: DateTime<Utc>, threshold_days: i64) -> bool {
    account.subscription_status == SubscriptionStatus::Active
        && days_remaining(account, now) <= threshold_days
}

#[must_use]
pub fn compute_access_facts(account: &Account, now: DateTime<Utc>) -> AccessFacts {
    AccessFacts {
        is_expired: is_expired(account, now),
        days_remaining: days_remaining(account, now),
        can_access: can_access(account, now),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryWarning {
    pub days_remaining: i64,
    pub message: String,
}

/// Notice attached to profile responses when an active subscription is close to its end.
#[must_use]
pub fn expiry_warning(
    account: &Account,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> Option<ExpiryWarning> {
    if !is_expiring_soon(account, now, threshold_days) {
        return None;
    }

    let days_remaining = days_remaining(account, now);
    Some(ExpiryWarning {
        days_remaining,
        message: format!("Your subscription expires in {days_remaining} days"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap()
    }

    fn active_until(end_date: Option<DateTime<Utc>>) -> Account {
        Account {
            is_active: true,
            subscription_status: SubscriptionStatus::Active,
            subscription_end_date: end_date,
            ..Default::default()
        }
    }

    #[test]
    fn test_expired_without_end_date() {
        let account = active_until(None);
        assert!(is_expired(&account, now()));
        assert_eq!(days_remaining(&account, now()), 0);
        assert!(!can_access(&account, now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let end = now();
        let account = active_until(Some(end));

        assert!(is_expired(&account, end + Duration::milliseconds(1)));
        assert!(!is_expired(&account, end - Duration::milliseconds(1)));
        assert!(!is_expired(&account, end));
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let account = active_until(Some(now() + Duration::hours(36)));
        assert_eq!(days_remaining(&account, now()), 2);

        let account = active_until(Some(now() + Duration::days(3)));
        assert_eq!(days_remaining(&account, now()), 3);

        let account = active_until(Some(now() + Duration::milliseconds(1)));
        assert_eq!(days_remaining(&account, now()), 1);
    }

    #[test]
    fn test_days_remaining_floored_at_zero() {
        let account = active_until(Some(now() - Duration::days(4)));
        assert_eq!(days_remaining(&account, now()), 0);
    }

    #[test]
    fn test_inactive_account_cannot_access() {
        let mut account = active_until(Some(now() + Duration::days(30)));
        assert!(can_access(&account, now()));

        account.is_active = false;
        assert!(!can_access(&account, now()));
        assert_eq!(
            access_denial(&account, now()),
            Some(AccessDenial::AccountDisabled)
        );
    }

    #[test]
    fn test_pending_subscription_cannot_access() {
        let mut account = active_until(Some(now() + Duration::days(30)));
        account.subscription_status = SubscriptionStatus::PendingApproval;

        assert_eq!(
            access_denial(&account, now()),
            Some(AccessDenial::NoActiveSubscription)
        );
    }

    #[test]
    fn test_stale_active_status_is_still_expired() {
        let account = active_until(Some(now() - Duration::days(1)));
        assert_eq!(
            access_denial(&account, now()),
            Some(AccessDenial::SubscriptionExpired)
        );
    }

    #[test]
    fn test_expiring_soon() {
        let account = active_until(Some(now() + Duration::days(5)));
        assert!(is_expiring_soon(&account, now(), 7));
        assert!(!is_expiring_soon(&account, now(), 4));

        let warning = expiry_warning(&account, now(), 7).unwrap();
        assert_eq!(warning.days_remaining, 5);
        assert_eq!(warning.message, "Your subscription expires in 5 days");

        let mut cancelled = account;
        cancelled.subscription_status = SubscriptionStatus::Cancelled;
        assert!(!is_expiring_soon(&cancelled, now(), 7));
    }

    #[test]
    fn test_access_facts() {
        let account = active_until(Some(now() + Duration::days(10)));
        assert_eq!(
            compute_access_facts(&account, now()),
            AccessFacts {
                is_expired: false,
                days_remaining: 10,
                can_access: true,
            }
        );
    }
}
