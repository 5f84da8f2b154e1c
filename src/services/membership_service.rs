//! Domain service for subscriptions and their payments.
//!
//! Every operation that touches both an account and a payment commits them
//! in a single transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::approval::WorkflowError;
use crate::domain::pricing::PricingError;
use crate::models::{Account, Payment, PaymentMethod, Plan};

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Account {0} not found")]
    AccountNotFound(i32),

    #[error("Payment {0} not found")]
    PaymentNotFound(i32),

    #[error("No pending payment found for account {0}")]
    NoPendingPayment(i32),

    #[error("Payment {0} belongs to another account")]
    NotOwner(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<WorkflowError> for MembershipError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidArgument(msg) => Self::Validation(msg),
            WorkflowError::StateConflict(msg) => Self::StateConflict(msg),
        }
    }
}

impl From<PricingError> for MembershipError {
    fn from(err: PricingError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<sea_orm::DbErr> for MembershipError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MembershipError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// How the approved subscription's end date is chosen.
///
/// `end_date` wins over `months`; with neither, the payment's own duration
/// applies. `plan` replaces the payment's plan before approval.
#[derive(Debug, Clone, Default)]
pub struct ApprovalOptions {
    pub end_date: Option<DateTime<Utc>>,
    pub months: Option<u32>,
    pub plan: Option<Plan>,
}

/// Account and payment as committed by a workflow transition.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipDecision {
    pub account: Account,
    pub payment: Payment,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub plan: String,
    pub months: u32,
    pub payment_method: PaymentMethod,
}

/// Admin-editable payment details. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PaymentInfoUpdate {
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub payment_proof: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingApprovals {
    pub accounts: Vec<Account>,
    pub payments: Vec<Payment>,
}

#[async_trait::async_trait]
pub trait MembershipService: Send + Sync {
    /// Approves the account's pending registration payment.
    ///
    /// # Errors
    ///
    /// [`MembershipError::NoPendingPayment`] when nothing awaits approval,
    /// which is also what a repeated approval sees.
    async fn approve_membership(
        &self,
        account_id: i32,
        admin_id: i32,
        options: ApprovalOptions,
    ) -> Result<MembershipDecision, MembershipError>;

    /// Rejects the pending registration payment; `reason` must not be blank.
    async fn reject_membership(
        &self,
        account_id: i32,
        admin_id: i32,
        reason: &str,
    ) -> Result<MembershipDecision, MembershipError>;

    /// Settles a payment and extends its owner's subscription.
    ///
    /// `owner` restricts the operation to that account's payments. A
    /// registration payment awaiting an administrator is never settled here.
    ///
    /// # Errors
    ///
    /// [`MembershipError::StateConflict`] for a payment awaiting approval, a
    /// terminal payment, or a gateway transaction id already recorded on
    /// another payment.
    async fn mark_payment_completed(
        &self,
        payment_id: i32,
        owner: Option<i32>,
        details: serde_json::Value,
    ) -> Result<MembershipDecision, MembershipError>;

    async fn mark_payment_failed(
        &self,
        payment_id: i32,
        reason: Option<&str>,
    ) -> Result<Payment, MembershipError>;

    async fn extend_subscription(
        &self,
        account_id: i32,
        months: u32,
        plan: Option<Plan>,
    ) -> Result<Account, MembershipError>;

    /// Creates a priced payment in `pending` state for the account.
    async fn create_payment(
        &self,
        account_id: i32,
        request: CreatePaymentRequest,
    ) -> Result<Payment, MembershipError>;

    async fn get_payment(&self, payment_id: i32) -> Result<Payment, MembershipError>;

    /// Newest first, at most 50.
    async fn list_account_payments(&self, account_id: i32) -> Result<Vec<Payment>, MembershipError>;

    async fn pending_approvals(&self) -> Result<PendingApprovals, MembershipError>;

    async fn update_payment_info(
        &self,
        payment_id: i32,
        update: PaymentInfoUpdate,
    ) -> Result<Payment, MembershipError>;
}
