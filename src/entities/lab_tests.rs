use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lab_tests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub code: String,

    pub name: String,

    pub category: Option<String>,

    pub price: i64,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lab_group_tests::Entity")]
    LabGroupTests,
    #[sea_orm(has_many = "super::lab_results::Entity")]
    LabResults,
}

impl Related<super::lab_group_tests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabGroupTests.def()
    }
}

impl Related<super::lab_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
