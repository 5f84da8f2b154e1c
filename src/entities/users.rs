use sea_orm::entity::prelude::*;

use super::enums::{ApprovalStatus, Plan, Role, SubscriptionStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Always stored lower-cased.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Random API key (64-char hex string)
    #[sea_orm(unique)]
    pub api_key: String,

    pub full_name: String,

    pub role: Role,

    pub subscription_status: SubscriptionStatus,

    pub subscription_plan: Plan,

    pub subscription_start_date: Option<DateTimeUtc>,

    pub subscription_end_date: Option<DateTimeUtc>,

    pub last_payment_date: Option<DateTimeUtc>,

    pub total_paid: i64,

    pub approval_status: ApprovalStatus,

    pub approved_by: Option<i32>,

    pub approved_at: Option<DateTimeUtc>,

    pub rejection_reason: Option<String>,

    pub is_active: bool,

    pub login_attempts: i32,

    pub lock_until: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
