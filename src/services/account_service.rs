//! Domain service for administering accounts and reporting on payments.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::repositories::{AccountFilter, Page, PaymentFilter};
use crate::domain::approval::WorkflowError;
use crate::domain::pricing::PricingError;
use crate::models::{Account, Payment, Plan, Role, SubscriptionStatus};

pub const RECENT_PAYMENTS_LIMIT: u64 = 10;
pub const REVENUE_BUCKETS: usize = 12;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<WorkflowError> for AccountError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidArgument(msg) => Self::Validation(msg),
            WorkflowError::StateConflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<PricingError> for AccountError {
    fn from(err: PricingError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_users: u64,
    pub expired_users: u64,
    pub pending_users: u64,
    pub pending_approval_users: u64,
    pub total_revenue: i64,
    pub monthly_revenue: i64,
    pub expiring_users_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountDetail {
    pub account: Account,
    pub recent_payments: Vec<Payment>,
}

/// Admin edits to an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Direct subscription override. A positive `months` extends the window
/// the same way a completed payment does.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub plan: Option<Plan>,
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RevenuePeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl RevenuePeriod {
    const fn format(self) -> &'static str {
        match self {
            Self::Daily => "%Y-%m-%d",
            Self::Weekly => "%Y-%U",
            Self::Monthly => "%Y-%m",
            Self::Yearly => "%Y",
        }
    }

    #[must_use]
    pub fn key(self, date: DateTime<Utc>) -> String {
        date.format(self.format()).to_string()
    }
}

impl fmt::Display for RevenuePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        })
    }
}

impl FromStr for RevenuePeriod {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(AccountError::Validation(format!(
                "Invalid period '{other}', expected daily, weekly, monthly or yearly"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRevenue {
    pub plan: Plan,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub period: String,
    pub total_revenue: i64,
    pub total_transactions: u64,
    pub plans: Vec<PlanRevenue>,
}

/// Groups settled payments by period key and keeps the most recent
/// [`REVENUE_BUCKETS`] buckets in ascending order.
#[must_use]
pub fn revenue_buckets(
    payments: &[(DateTime<Utc>, i64, Plan)],
    period: RevenuePeriod,
) -> Vec<RevenueBucket> {
    let mut grouped: BTreeMap<String, (i64, u64, BTreeMap<&'static str, (Plan, i64)>)> =
        BTreeMap::new();

    for &(date, amount, plan) in payments {
        let bucket = grouped.entry(period.key(date)).or_default();
        bucket.0 += amount;
        bucket.1 += 1;
        bucket.2.entry(plan.as_str()).or_insert((plan, 0)).1 += amount;
    }

    let skip = grouped.len().saturating_sub(REVENUE_BUCKETS);

    grouped
        .into_iter()
        .skip(skip)
        .map(|(key, (total, count, plans))| RevenueBucket {
            period: key,
            total_revenue: total,
            total_transactions: count,
            plans: plans
                .into_values()
                .map(|(plan, amount)| PlanRevenue { plan, amount })
                .collect(),
        })
        .collect()
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    async fn dashboard_stats(&self) -> Result<DashboardStats, AccountError>;

    async fn list_accounts(
        &self,
        filter: AccountFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<Account>, AccountError>;

    /// The account and its ten most recent payments.
    async fn get_account_detail(&self, account_id: i32) -> Result<AccountDetail, AccountError>;

    /// # Errors
    ///
    /// [`AccountError::Conflict`] when the new email belongs to another account.
    async fn update_account(
        &self,
        account_id: i32,
        update: AccountUpdate,
    ) -> Result<Account, AccountError>;

    async fn update_subscription(
        &self,
        account_id: i32,
        update: SubscriptionUpdate,
    ) -> Result<Account, AccountError>;

    /// Deletes the account and every payment it owns.
    async fn delete_account(&self, account_id: i32) -> Result<(), AccountError>;

    /// Active accounts whose subscription ends within `days` from now.
    async fn expiring_accounts(&self, days: i64) -> Result<Vec<Account>, AccountError>;

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<Payment>, AccountError>;

    async fn revenue_report(
        &self,
        period: RevenuePeriod,
    ) -> Result<Vec<RevenueBucket>, AccountError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_period_keys() {
        let date = at(2025, 3, 9);
        assert_eq!(RevenuePeriod::Daily.key(date), "2025-03-09");
        assert_eq!(RevenuePeriod::Weekly.key(date), "2025-10");
        assert_eq!(RevenuePeriod::Monthly.key(date), "2025-03");
        assert_eq!(RevenuePeriod::Yearly.key(date), "2025");
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("Weekly".parse::<RevenuePeriod>().unwrap(), RevenuePeriod::Weekly);
        assert!("hourly".parse::<RevenuePeriod>().is_err());
    }

    #[test]
    fn test_revenue_buckets_group_by_plan() {
        let payments = vec![
            (at(2025, 1, 5), 299, Plan::Basic),
            (at(2025, 1, 20), 599, Plan::Premium),
            (at(2025, 1, 21), 299, Plan::Basic),
            (at(2025, 2, 1), 999, Plan::Enterprise),
        ];

        let buckets = revenue_buckets(&payments, RevenuePeriod::Monthly);
        assert_eq!(buckets.len(), 2);

        let january = &buckets[0];
        assert_eq!(january.period, "2025-01");
        assert_eq!(january.total_revenue, 1197);
        assert_eq!(january.total_transactions, 3);
        assert_eq!(
            january.plans,
            vec![
                PlanRevenue { plan: Plan::Basic, amount: 598 },
                PlanRevenue { plan: Plan::Premium, amount: 599 },
            ]
        );
        assert_eq!(buckets[1].period, "2025-02");
    }

    #[test]
    fn test_revenue_buckets_keep_most_recent_twelve() {
        let payments: Vec<_> = (1..=14)
            .map(|month| {
                let (year, month) = if month > 12 { (2025, month - 12) } else { (2024, month) };
                (at(year, month, 1), 100, Plan::Basic)
            })
            .collect();

        let buckets = revenue_buckets(&payments, RevenuePeriod::Monthly);
        assert_eq!(buckets.len(), REVENUE_BUCKETS);
        assert_eq!(buckets.first().unwrap().period, "2024-03");
        assert_eq!(buckets.last().unwrap().period, "2025-02");
    }
}
