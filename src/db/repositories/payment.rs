use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::Page;
use crate::entities::enums::{ApprovalStatus, Currency, PaymentMethod, PaymentStatus, Plan};
use crate::entities::payments;
use crate::models::Payment;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub account_id: i32,
    pub amount: i64,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub approval_status: ApprovalStatus,
    pub subscription_plan: Plan,
    pub subscription_duration: i32,
    pub due_date: DateTime<Utc>,
    pub payment_reference: Option<String>,
    pub payment_proof: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub plan: Option<Plan>,
}

pub struct PaymentRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PaymentRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<payments::Model>> {
        payments::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query payment by ID")
    }

    /// The account's registration payment still awaiting a decision.
    pub async fn pending_approval_for(&self, account_id: i32) -> Result<Option<payments::Model>> {
        payments::Entity::find()
            .filter(payments::Column::AccountId.eq(account_id))
            .filter(payments::Column::PaymentStatus.eq(PaymentStatus::PendingApproval))
            .filter(payments::Column::ApprovalStatus.eq(ApprovalStatus::Pending))
            .order_by_desc(payments::Column::CreatedAt)
            .one(self.conn)
            .await
            .context("Failed to query pending payment")
    }

    pub async fn insert(&self, payment: NewPayment, now: DateTime<Utc>) -> Result<payments::Model> {
        let model = payments::ActiveModel {
            account_id: Set(payment.account_id),
            amount: Set(payment.amount),
            currency: Set(payment.currency),
            payment_method: Set(payment.payment_method),
            payment_status: Set(payment.payment_status),
            approval_status: Set(payment.approval_status),
            subscription_plan: Set(payment.subscription_plan),
            subscription_duration: Set(payment.subscription_duration),
            transaction_id: Set(None),
            receipt_number: Set(None),
            gateway_response: Set(serde_json::json!({})),
            payment_date: Set(None),
            due_date: Set(payment.due_date),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            payment_proof: Set(payment.payment_proof),
            payment_reference: Set(payment.payment_reference),
            notes: Set(payment.notes),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model
            .insert(self.conn)
            .await
            .context("Failed to insert payment")
    }

    pub async fn save(&self, payment: &Payment) -> Result<()> {
        let model = payments::ActiveModel {
            id: Set(payment.id),
            amount: Set(payment.amount),
            payment_method: Set(payment.payment_method),
            payment_status: Set(payment.payment_status),
            approval_status: Set(payment.approval_status),
            subscription_plan: Set(payment.subscription_plan),
            subscription_duration: Set(payment.subscription_duration),
            transaction_id: Set(payment.transaction_id.clone()),
            receipt_number: Set(payment.receipt_number.clone()),
            gateway_response: Set(payment.gateway_response.clone()),
            payment_date: Set(payment.payment_date),
            approved_by: Set(payment.approved_by),
            approved_at: Set(payment.approved_at),
            rejection_reason: Set(payment.rejection_reason.clone()),
            payment_proof: Set(payment.payment_proof.clone()),
            payment_reference: Set(payment.payment_reference.clone()),
            notes: Set(payment.notes.clone()),
            updated_at: Set(payment.updated_at),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .with_context(|| format!("Failed to update payment {}", payment.id))?;

        Ok(())
    }

    /// Newest first.
    pub async fn list_for_account(&self, account_id: i32, limit: u64) -> Result<Vec<payments::Model>> {
        payments::Entity::find()
            .filter(payments::Column::AccountId.eq(account_id))
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
            .context("Failed to list account payments")
    }

    pub async fn list(
        &self,
        filter: &PaymentFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<payments::Model>> {
        let mut query = payments::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(payments::Column::PaymentStatus.eq(status));
        }
        if let Some(plan) = filter.plan {
            query = query.filter(payments::Column::SubscriptionPlan.eq(plan));
        }

        let paginator = query
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .paginate(self.conn, limit);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count payments")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list payments")?;

        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    /// Registration payments awaiting a decision, oldest first.
    pub async fn pending_approval(&self) -> Result<Vec<payments::Model>> {
        payments::Entity::find()
            .filter(payments::Column::PaymentStatus.eq(PaymentStatus::PendingApproval))
            .filter(payments::Column::ApprovalStatus.eq(ApprovalStatus::Pending))
            .order_by_asc(payments::Column::CreatedAt)
            .all(self.conn)
            .await
            .context("Failed to query pending payments")
    }

    /// Sum of completed payments settled at or after `since` (all time if `None`).
    pub async fn completed_revenue(&self, since: Option<DateTime<Utc>>) -> Result<i64> {
        let mut query = payments::Entity::find()
            .select_only()
            .column(payments::Column::Amount)
            .filter(payments::Column::PaymentStatus.eq(PaymentStatus::Completed));

        if let Some(since) = since {
            query = query.filter(payments::Column::PaymentDate.gte(since));
        }

        let amounts: Vec<i64> = query
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to sum revenue")?;

        Ok(amounts.into_iter().sum())
    }

    /// `(payment_date, amount, plan)` of every settled payment, oldest first.
    pub async fn completed_amounts(&self) -> Result<Vec<(DateTime<Utc>, i64, Plan)>> {
        payments::Entity::find()
            .select_only()
            .column(payments::Column::PaymentDate)
            .column(payments::Column::Amount)
            .column(payments::Column::SubscriptionPlan)
            .filter(payments::Column::PaymentStatus.eq(PaymentStatus::Completed))
            .filter(payments::Column::PaymentDate.is_not_null())
            .order_by_asc(payments::Column::PaymentDate)
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load completed payments")
    }

    pub async fn delete_for_account(&self, account_id: i32) -> Result<u64> {
        let result = payments::Entity::delete_many()
            .filter(payments::Column::AccountId.eq(account_id))
            .exec(self.conn)
            .await
            .context("Failed to delete account payments")?;

        Ok(result.rows_affected)
    }
}
