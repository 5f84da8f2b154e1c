use sea_orm::entity::prelude::*;

use super::enums::VisitStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "visits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub reference_number: String,

    pub patient_id: i32,

    pub visit_date: DateTimeUtc,

    pub organization: Option<String>,

    pub other_organization: Option<String>,

    pub rights: Option<String>,

    pub weight: Option<f64>,

    pub height: Option<f64>,

    pub blood_pressure: Option<String>,

    pub pulse: Option<i32>,

    pub medical_history: Option<String>,

    pub symptoms: Option<String>,

    pub reason: Option<String>,

    pub doctor: Option<String>,

    pub status: VisitStatus,

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
}

impl Related<super::patients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
