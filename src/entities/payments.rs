use sea_orm::entity::prelude::*;

use super::enums::{ApprovalStatus, Currency, PaymentMethod, PaymentStatus, Plan};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub account_id: i32,

    /// Whole currency units.
    pub amount: i64,

    pub currency: Currency,

    pub payment_method: PaymentMethod,

    pub payment_status: PaymentStatus,

    pub approval_status: ApprovalStatus,

    pub subscription_plan: Plan,

    /// Months, 1..=36
    pub subscription_duration: i32,

    #[sea_orm(unique)]
    pub transaction_id: Option<String>,

    #[sea_orm(unique)]
    pub receipt_number: Option<String>,

    pub gateway_response: Json,

    pub payment_date: Option<DateTimeUtc>,

    pub due_date: DateTimeUtc,

    pub approved_by: Option<i32>,

    pub approved_at: Option<DateTimeUtc>,

    pub rejection_reason: Option<String>,

    pub payment_proof: Option<String>,

    pub payment_reference: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AccountId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
