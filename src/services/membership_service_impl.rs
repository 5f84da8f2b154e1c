//! `SeaORM` implementation of the `MembershipService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

use crate::config::SubscriptionConfig;
use crate::db::{Store, is_unique_violation_error};
use crate::db::repositories::{NewPayment, PaymentRepository, UserRepository};
use crate::domain::{approval, pricing};
use crate::models::{Account, ApprovalStatus, Payment, PaymentStatus, Plan};
use crate::services::membership_service::{
    ApprovalOptions, CreatePaymentRequest, MembershipDecision, MembershipError,
    MembershipService, PaymentInfoUpdate, PendingApprovals,
};
use crate::services::validation;

const ACCOUNT_PAYMENTS_LIMIT: u64 = 50;

pub struct SeaOrmMembershipService {
    store: Store,
    subscription: SubscriptionConfig,
}

impl SeaOrmMembershipService {
    #[must_use]
    pub const fn new(store: Store, subscription: SubscriptionConfig) -> Self {
        Self {
            store,
            subscription,
        }
    }
}

fn record_decision(decision: &'static str) {
    metrics::counter!("membership_decisions_total", "decision" => decision).increment(1);
}

#[async_trait]
impl MembershipService for SeaOrmMembershipService {
    async fn approve_membership(
        &self,
        account_id: i32,
        admin_id: i32,
        options: ApprovalOptions,
    ) -> Result<MembershipDecision, MembershipError> {
        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let payments = PaymentRepository::new(&txn);

        let mut account: Account = users
            .get_by_id(account_id)
            .await?
            .ok_or(MembershipError::AccountNotFound(account_id))?
            .into();
        let mut payment: Payment = payments
            .pending_approval_for(account_id)
            .await?
            .ok_or(MembershipError::NoPendingPayment(account_id))?
            .into();

        let now = Utc::now();

        if let Some(plan) = options.plan {
            payment.subscription_plan = plan;
        }

        let end_override = match (options.end_date, options.months) {
            (Some(end_date), _) => Some(end_date),
            (None, Some(months)) => {
                let months = pricing::validate_duration(months)?;
                Some(approval::add_months(now, months)?)
            }
            (None, None) => None,
        };

        approval::approve(&mut account, &mut payment, admin_id, end_override, now)?;

        payments.save(&payment).await?;
        users.save(&account).await?;
        txn.commit().await?;

        record_decision("approved");
        info!(
            account_id,
            payment_id = payment.id,
            admin_id,
            plan = %account.subscription_plan,
            end_date = ?account.subscription_end_date,
            "Membership approved"
        );

        Ok(MembershipDecision { account, payment })
    }

    async fn reject_membership(
        &self,
        account_id: i32,
        admin_id: i32,
        reason: &str,
    ) -> Result<MembershipDecision, MembershipError> {
        if reason.trim().is_empty() {
            return Err(MembershipError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let payments = PaymentRepository::new(&txn);

        let mut account: Account = users
            .get_by_id(account_id)
            .await?
            .ok_or(MembershipError::AccountNotFound(account_id))?
            .into();
        let mut payment: Payment = payments
            .pending_approval_for(account_id)
            .await?
            .ok_or(MembershipError::NoPendingPayment(account_id))?
            .into();

        approval::reject(&mut account, &mut payment, admin_id, reason, Utc::now())?;

        payments.save(&payment).await?;
        users.save(&account).await?;
        txn.commit().await?;

        record_decision("rejected");
        info!(
            account_id,
            payment_id = payment.id,
            admin_id,
            reason = reason.trim(),
            "Membership rejected"
        );

        Ok(MembershipDecision { account, payment })
    }

    async fn mark_payment_completed(
        &self,
        payment_id: i32,
        owner: Option<i32>,
        details: serde_json::Value,
    ) -> Result<MembershipDecision, MembershipError> {
        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let payments = PaymentRepository::new(&txn);

        let mut payment: Payment = payments
            .get_by_id(payment_id)
            .await?
            .ok_or(MembershipError::PaymentNotFound(payment_id))?
            .into();

        if owner.is_some_and(|owner| owner != payment.account_id) {
            return Err(MembershipError::NotOwner(payment_id));
        }
        // Registration payments only settle through the approval workflow.
        if payment.is_pending_approval() {
            return Err(MembershipError::StateConflict(format!(
                "Payment {payment_id} is awaiting administrator approval"
            )));
        }

        let mut account: Account = users
            .get_by_id(payment.account_id)
            .await?
            .ok_or(MembershipError::AccountNotFound(payment.account_id))?
            .into();

        approval::mark_completed(&mut account, &mut payment, details, Utc::now())?;

        if let Err(err) = payments.save(&payment).await {
            if is_unique_violation_error(&err) {
                return Err(MembershipError::StateConflict(format!(
                    "Transaction {} is already recorded on another payment",
                    payment.transaction_id.as_deref().unwrap_or_default()
                )));
            }
            return Err(err.into());
        }
        users.save(&account).await?;
        txn.commit().await?;

        info!(
            account_id = account.id,
            payment_id,
            amount = payment.amount,
            receipt_number = payment.receipt_number.as_deref().unwrap_or_default(),
            "Payment completed"
        );

        Ok(MembershipDecision { account, payment })
    }

    async fn mark_payment_failed(
        &self,
        payment_id: i32,
        reason: Option<&str>,
    ) -> Result<Payment, MembershipError> {
        let payments = self.store.payments();

        let mut payment: Payment = payments
            .get_by_id(payment_id)
            .await?
            .ok_or(MembershipError::PaymentNotFound(payment_id))?
            .into();

        approval::mark_failed(&mut payment, reason, Utc::now())?;
        payments.save(&payment).await?;

        info!(payment_id, account_id = payment.account_id, "Payment marked failed");
        Ok(payment)
    }

    async fn extend_subscription(
        &self,
        account_id: i32,
        months: u32,
        plan: Option<Plan>,
    ) -> Result<Account, MembershipError> {
        let users = self.store.users();

        let mut account: Account = users
            .get_by_id(account_id)
            .await?
            .ok_or(MembershipError::AccountNotFound(account_id))?
            .into();

        approval::extend_subscription(&mut account, months, plan, Utc::now())?;
        users.save(&account).await?;

        info!(
            account_id,
            months,
            end_date = ?account.subscription_end_date,
            "Subscription extended"
        );
        Ok(account)
    }

    async fn create_payment(
        &self,
        account_id: i32,
        request: CreatePaymentRequest,
    ) -> Result<Payment, MembershipError> {
        let plan = pricing::parse_plan(&request.plan)?;
        let months = pricing::validate_duration(request.months)?;
        let amount = pricing::price(plan, months)?;
        let duration =
            i32::try_from(months).map_err(|e| MembershipError::Internal(e.to_string()))?;

        if self.store.users().get_by_id(account_id).await?.is_none() {
            return Err(MembershipError::AccountNotFound(account_id));
        }

        let now = Utc::now();
        let payment = self
            .store
            .payments()
            .insert(
                NewPayment {
                    account_id,
                    amount,
                    currency: self.subscription.currency,
                    payment_method: request.payment_method,
                    payment_status: PaymentStatus::Pending,
                    approval_status: ApprovalStatus::Pending,
                    subscription_plan: plan,
                    subscription_duration: duration,
                    due_date: now + Duration::days(self.subscription.payment_due_days),
                    payment_reference: None,
                    payment_proof: None,
                    notes: None,
                },
                now,
            )
            .await?;

        info!(
            account_id,
            payment_id = payment.id,
            plan = %plan,
            months,
            amount,
            "Payment created"
        );
        Ok(payment.into())
    }

    async fn get_payment(&self, payment_id: i32) -> Result<Payment, MembershipError> {
        self.store
            .payments()
            .get_by_id(payment_id)
            .await?
            .map(Payment::from)
            .ok_or(MembershipError::PaymentNotFound(payment_id))
    }

    async fn list_account_payments(&self, account_id: i32) -> Result<Vec<Payment>, MembershipError> {
        let payments = self
            .store
            .payments()
            .list_for_account(account_id, ACCOUNT_PAYMENTS_LIMIT)
            .await?;

        Ok(payments.into_iter().map(Payment::from).collect())
    }

    async fn pending_approvals(&self) -> Result<PendingApprovals, MembershipError> {
        let accounts = self.store.users().pending_approval().await?;
        let payments = self.store.payments().pending_approval().await?;

        Ok(PendingApprovals {
            accounts: accounts.into_iter().map(Account::from).collect(),
            payments: payments.into_iter().map(Payment::from).collect(),
        })
    }

    async fn update_payment_info(
        &self,
        payment_id: i32,
        update: PaymentInfoUpdate,
    ) -> Result<Payment, MembershipError> {
        validation::notes(update.notes.as_deref()).map_err(MembershipError::Validation)?;

        let payments = self.store.payments();
        let mut payment: Payment = payments
            .get_by_id(payment_id)
            .await?
            .ok_or(MembershipError::PaymentNotFound(payment_id))?
            .into();

        if let Some(method) = update.payment_method {
            payment.payment_method = method;
        }
        if let Some(reference) = validation::blank_to_none(update.payment_reference) {
            payment.payment_reference = Some(reference);
        }
        if let Some(proof) = validation::blank_to_none(update.payment_proof) {
            payment.payment_proof = Some(proof);
        }
        if let Some(notes) = validation::blank_to_none(update.notes) {
            payment.notes = Some(notes);
        }
        payment.updated_at = Utc::now();

        payments.save(&payment).await?;

        info!(payment_id, "Payment information updated");
        Ok(payment)
    }
}
