use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::enums::{ApprovalStatus, Plan, Role, SubscriptionStatus};
use crate::entities::users;

/// An account snapshot without credentials (password hash, API key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan: Plan,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub total_paid: i64,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub is_active: bool,
    pub login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<users::Model> for Account {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            subscription_status: model.subscription_status,
            subscription_plan: model.subscription_plan,
            subscription_start_date: model.subscription_start_date,
            subscription_end_date: model.subscription_end_date,
            last_payment_date: model.last_payment_date,
            total_paid: model.total_paid,
            approval_status: model.approval_status,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            is_active: model.is_active,
            login_attempts: model.login_attempts,
            lock_until: model.lock_until,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
