//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::info;

use crate::config::SubscriptionConfig;
use crate::db::Store;
use crate::db::repositories::{AccountFilter, Page, PaymentFilter, PaymentRepository, UserRepository};
use crate::domain::approval;
use crate::models::{Account, Payment, SubscriptionStatus};
use crate::services::account_service::{
    AccountDetail, AccountError, AccountService, AccountUpdate, DashboardStats,
    RECENT_PAYMENTS_LIMIT, RevenueBucket, RevenuePeriod, SubscriptionUpdate, revenue_buckets,
};
use crate::services::validation;

pub struct SeaOrmAccountService {
    store: Store,
    subscription: SubscriptionConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(store: Store, subscription: SubscriptionConfig) -> Self {
        Self {
            store,
            subscription,
        }
    }

    async fn load(&self, account_id: i32) -> Result<Account, AccountError> {
        self.store
            .users()
            .get_by_id(account_id)
            .await?
            .map(Account::from)
            .ok_or(AccountError::NotFound(account_id))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn dashboard_stats(&self) -> Result<DashboardStats, AccountError> {
        let users = self.store.users();
        let payments = self.store.payments();
        let now = Utc::now();

        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .ok_or_else(|| AccountError::Internal("Invalid month start".to_string()))?;

        let expiring = users
            .expiring_between(
                now,
                now + Duration::days(self.subscription.expiring_threshold_days),
            )
            .await?;

        Ok(DashboardStats {
            total_users: users.count().await?,
            active_users: users.count_by_status(SubscriptionStatus::Active).await?,
            expired_users: users.count_by_status(SubscriptionStatus::Expired).await?,
            pending_users: users.count_by_status(SubscriptionStatus::Pending).await?,
            pending_approval_users: users
                .count_by_status(SubscriptionStatus::PendingApproval)
                .await?,
            total_revenue: payments.completed_revenue(None).await?,
            monthly_revenue: payments.completed_revenue(Some(month_start)).await?,
            expiring_users_count: expiring.len() as u64,
        })
    }

    async fn list_accounts(
        &self,
        filter: AccountFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<Account>, AccountError> {
        let page = self.store.users().list(&filter, page, limit).await?;
        Ok(page.map(Account::from))
    }

    async fn get_account_detail(&self, account_id: i32) -> Result<AccountDetail, AccountError> {
        let account = self.load(account_id).await?;
        let recent_payments = self
            .store
            .payments()
            .list_for_account(account_id, RECENT_PAYMENTS_LIMIT)
            .await?;

        Ok(AccountDetail {
            account,
            recent_payments: recent_payments.into_iter().map(Payment::from).collect(),
        })
    }

    async fn update_account(
        &self,
        account_id: i32,
        update: AccountUpdate,
    ) -> Result<Account, AccountError> {
        let mut account = self.load(account_id).await?;

        if let Some(full_name) = update.full_name {
            account.full_name =
                validation::required("Full name", &full_name).map_err(AccountError::Validation)?;
        }

        if let Some(email) = update.email {
            let email = validation::email(&email).map_err(AccountError::Validation)?;
            // The account's own username is excluded, so only the email can clash.
            if self
                .store
                .users()
                .is_taken(&account.username, &email, Some(account_id))
                .await?
            {
                return Err(AccountError::Conflict(format!(
                    "Email {email} is already in use"
                )));
            }
            account.email = email;
        }

        if let Some(role) = update.role {
            account.role = role;
        }
        if let Some(is_active) = update.is_active {
            account.is_active = is_active;
        }
        account.updated_at = Utc::now();

        self.store.users().save(&account).await?;

        info!(account_id, role = ?account.role, is_active = account.is_active, "Account updated");
        Ok(account)
    }

    async fn update_subscription(
        &self,
        account_id: i32,
        update: SubscriptionUpdate,
    ) -> Result<Account, AccountError> {
        let mut account = self.load(account_id).await?;
        let now = Utc::now();

        if let Some(status) = update.status {
            account.subscription_status = status;
        }
        if let Some(plan) = update.plan {
            account.subscription_plan = plan;
        }
        if let Some(months) = update.months.filter(|m| *m > 0) {
            approval::extend_subscription(&mut account, months, update.plan, now)?;
        }
        account.updated_at = now;

        self.store.users().save(&account).await?;

        info!(
            account_id,
            status = ?account.subscription_status,
            plan = %account.subscription_plan,
            end_date = ?account.subscription_end_date,
            "Subscription updated by admin"
        );
        Ok(account)
    }

    async fn delete_account(&self, account_id: i32) -> Result<(), AccountError> {
        let txn = self.store.begin().await?;

        let removed_payments = PaymentRepository::new(&txn)
            .delete_for_account(account_id)
            .await?;
        if !UserRepository::new(&txn).delete(account_id).await? {
            return Err(AccountError::NotFound(account_id));
        }

        txn.commit().await?;

        info!(account_id, removed_payments, "Account deleted");
        Ok(())
    }

    async fn expiring_accounts(&self, days: i64) -> Result<Vec<Account>, AccountError> {
        if days < 0 {
            return Err(AccountError::Validation(
                "Days cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let accounts = self
            .store
            .users()
            .expiring_between(now, now + Duration::days(days))
            .await?;

        Ok(accounts.into_iter().map(Account::from).collect())
    }

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<Payment>, AccountError> {
        let page = self.store.payments().list(&filter, page, limit).await?;
        Ok(page.map(Payment::from))
    }

    async fn revenue_report(
        &self,
        period: RevenuePeriod,
    ) -> Result<Vec<RevenueBucket>, AccountError> {
        let payments = self.store.payments().completed_amounts().await?;
        Ok(revenue_buckets(&payments, period))
    }
}
