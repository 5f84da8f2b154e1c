use sea_orm::entity::prelude::*;

use super::enums::{OrderPaymentMethod, OrderStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub patient_id: i32,

    pub visit_id: i32,

    pub total_amount: i64,

    pub payment_method: OrderPaymentMethod,

    pub status: OrderStatus,

    pub completed_at: Option<DateTimeUtc>,

    pub cancelled_at: Option<DateTimeUtc>,

    pub cancelled_by: Option<String>,

    pub cancellation_reason: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patients::Entity",
        from = "Column::PatientId",
        to = "super::patients::Column::Id",
        on_delete = "Cascade"
    )]
    Patients,
    #[sea_orm(
        belongs_to = "super::visits::Entity",
        from = "Column::VisitId",
        to = "super::visits::Column::Id",
        on_delete = "Cascade"
    )]
    Visits,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::patients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patients.def()
    }
}

impl Related<super::visits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
