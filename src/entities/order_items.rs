use sea_orm::entity::prelude::*;

/// One ordered lab group, with its name and unit price frozen at order time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub order_id: i32,

    /// Cleared when the group is later removed from the catalogue.
    pub lab_group_id: Option<i32>,

    pub name: String,

    pub price: i64,

    pub qty: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "Cascade"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::lab_groups::Entity",
        from = "Column::LabGroupId",
        to = "super::lab_groups::Column::Id",
        on_delete = "SetNull"
    )]
    LabGroups,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
