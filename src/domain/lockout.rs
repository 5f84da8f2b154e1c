//! Login attempt lockout.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_minutes: u32,
}

/// Outcome of recording one failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    /// Minutes left on an active lock, rounded up. `None` if not locked.
    #[must_use]
    pub fn remaining_minutes(
        &self,
        lock_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        let lock_until = lock_until.filter(|until| *until > now)?;
        let seconds = (lock_until - now).num_seconds();
        Some(((seconds + 59) / 60).max(1))
    }

    /// Counts one more failure and locks once the limit is reached.
    #[must_use]
    pub fn record_failure(&self, previous_attempts: i32, now: DateTime<Utc>) -> FailedAttempt {
        let attempts = previous_attempts.saturating_add(1);
        let limit = i32::try_from(self.max_attempts).unwrap_or(i32::MAX);

        let lock_until = (attempts >= limit)
            .then(|| now + Duration::minutes(i64::from(self.lockout_minutes)));

        FailedAttempt {
            attempts,
            lock_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const POLICY: LockoutPolicy = LockoutPolicy {
        max_attempts: 5,
        lockout_minutes: 30,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_locks_on_fifth_failure() {
        let mut attempts = 0;
        for _ in 0..4 {
            let outcome = POLICY.record_failure(attempts, now());
            assert!(outcome.lock_until.is_none());
            attempts = outcome.attempts;
        }

        let outcome = POLICY.record_failure(attempts, now());
        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.lock_until, Some(now() + Duration::minutes(30)));
    }

    #[test]
    fn test_remaining_minutes() {
        let until = Some(now() + Duration::minutes(30));
        assert_eq!(POLICY.remaining_minutes(until, now()), Some(30));
        assert_eq!(
            POLICY.remaining_minutes(until, now() + Duration::seconds(90)),
            Some(29)
        );
        assert_eq!(
            POLICY.remaining_minutes(until, now() + Duration::minutes(30)),
            None
        );
        assert_eq!(POLICY.remaining_minutes(None, now()), None);
    }
}
