use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::enums::{ApprovalStatus, Currency, PaymentMethod, PaymentStatus, Plan};
use crate::entities::payments;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payment {
    pub id: i32,
    pub account_id: i32,
    pub amount: i64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub approval_status: ApprovalStatus,
    pub subscription_plan: Plan,
    pub subscription_duration: i32,
    pub transaction_id: Option<String>,
    pub receipt_number: Option<String>,
    pub gateway_response: serde_json::Value,
    pub payment_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub payment_proof: Option<String>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Matches the single registration payment awaiting an admin decision.
    #[must_use]
    pub fn is_pending_approval(&self) -> bool {
        self.payment_status == PaymentStatus::PendingApproval
            && self.approval_status == ApprovalStatus::Pending
    }
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            amount: model.amount,
            currency: model.currency,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            approval_status: model.approval_status,
            subscription_plan: model.subscription_plan,
            subscription_duration: model.subscription_duration,
            transaction_id: model.transaction_id,
            receipt_number: model.receipt_number,
            gateway_response: model.gateway_response,
            payment_date: model.payment_date,
            due_date: model.due_date,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            payment_proof: model.payment_proof,
            payment_reference: model.payment_reference,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
