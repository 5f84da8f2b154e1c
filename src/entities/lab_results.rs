use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lab_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub visit_id: i32,

    pub lab_test_id: i32,

    pub result_value: Option<String>,

    pub unit: Option<String>,

    pub normal_range: Option<String>,

    pub note: Option<String>,

    pub recorded_at: DateTimeUtc,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::visits::Entity",
        from = "Column::VisitId",
        to = "super::visits::Column::Id",
        on_delete = "Cascade"
    )]
    Visits,
    #[sea_orm(
        belongs_to = "super::lab_tests::Entity",
        from = "Column::LabTestId",
        to = "super::lab_tests::Column::Id",
        on_delete = "Restrict"
    )]
    LabTests,
}

impl Related<super::visits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl Related<super::lab_tests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LabTests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
