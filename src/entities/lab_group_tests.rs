use sea_orm::entity::prelude::*;

/// Membership of a lab test in a lab group.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lab_group_tests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lab_group_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub lab_test_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lab_groups::Entity",
        from = "Column::LabGroupId",
        to = "super::lab_groups::Column::Id",
        on_delete = "Cascade"
    )]
    LabGroups,
    #[sea_orm(
        belongs_to = "super::lab_tests::Entity",
        from = "Column::LabTestId",
        to = "super::lab_tests::Column::Id",
        on_delete = "Cascade"
    )]
    LabTests,
}

impl Related<super::lab_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabGroups.def()
    }
}

impl Related<super::lab_tests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabTests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
