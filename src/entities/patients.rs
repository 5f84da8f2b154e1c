use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Registration code, `YYMM` + four digits. Legacy rows may carry an `L` marker.
    #[sea_orm(unique)]
    pub ln: Option<String>,

    pub hn: Option<String>,

    pub id_card: Option<String>,

    pub prefix: Option<String>,

    pub first_name: String,

    pub last_name: String,

    pub age: Option<i32>,

    pub gender: Option<String>,

    pub birth_date: Option<Date>,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::visits::Entity")]
    Visits,
}

impl Related<super::visits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
