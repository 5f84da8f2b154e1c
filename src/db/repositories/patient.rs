use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::sequence::LEGACY_MARKER;
use crate::entities::patients;

#[derive(Debug, Clone, Default)]
pub struct NewPatient {
    pub hn: Option<String>,
    pub id_card: Option<String>,
    pub prefix: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub struct PatientRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PatientRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<patients::Model>> {
        patients::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query patient by ID")
    }

    pub async fn get_by_id_card(&self, id_card: &str) -> Result<Option<patients::Model>> {
        patients::Entity::find()
            .filter(patients::Column::IdCard.eq(id_card.trim()))
            .one(self.conn)
            .await
            .context("Failed to query patient by ID card")
    }

    /// LN codes in the `prefix` month, including legacy marked ones.
    pub async fn ln_codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let codes: Vec<Option<String>> = patients::Entity::find()
            .select_only()
            .column(patients::Column::Ln)
            .filter(
                Condition::any()
                    .add(patients::Column::Ln.starts_with(prefix))
                    .add(patients::Column::Ln.starts_with(format!("{LEGACY_MARKER}{prefix}"))),
            )
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load LN codes")?;

        Ok(codes.into_iter().flatten().collect())
    }

    /// Highest LN ever stored, by string order.
    pub async fn last_ln(&self) -> Result<Option<String>> {
        let ln: Option<Option<String>> = patients::Entity::find()
            .select_only()
            .column(patients::Column::Ln)
            .filter(patients::Column::Ln.is_not_null())
            .order_by_desc(patients::Column::Ln)
            .into_tuple()
            .one(self.conn)
            .await
            .context("Failed to query last LN")?;

        Ok(ln.flatten())
    }

    /// Inserts with an already allocated LN. The raw `DbErr` is returned so
    /// callers can tell a lost LN race from other failures.
    pub async fn insert(
        &self,
        patient: NewPatient,
        ln: String,
        now: DateTime<Utc>,
    ) -> Result<patients::Model, DbErr> {
        let model = patients::ActiveModel {
            ln: Set(Some(ln)),
            hn: Set(patient.hn),
            id_card: Set(patient.id_card),
            prefix: Set(patient.prefix),
            first_name: Set(patient.first_name),
            last_name: Set(patient.last_name),
            age: Set(patient.age),
            gender: Set(patient.gender),
            birth_date: Set(patient.birth_date),
            phone: Set(patient.phone),
            address: Set(patient.address),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(self.conn).await
    }

    pub async fn update(&self, model: patients::ActiveModel) -> Result<patients::Model> {
        model
            .update(self.conn)
            .await
            .context("Failed to update patient")
    }

    /// Substring match on HN, names, ID card and LN. No term lists everyone.
    pub async fn search(&self, term: Option<&str>, limit: u64) -> Result<Vec<patients::Model>> {
        let mut query = patients::Entity::find();

        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(patients::Column::Hn.contains(term))
                    .add(patients::Column::FirstName.contains(term))
                    .add(patients::Column::LastName.contains(term))
                    .add(patients::Column::IdCard.contains(term))
                    .add(patients::Column::Ln.contains(term)),
            );
        }

        query
            .order_by_desc(patients::Column::CreatedAt)
            .order_by_desc(patients::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
            .context("Failed to search patients")
    }

    /// IDs of patients whose names, LN or HN contain `term`.
    pub async fn ids_matching(&self, term: &str) -> Result<Vec<i32>> {
        patients::Entity::find()
            .select_only()
            .column(patients::Column::Id)
            .filter(
                Condition::any()
                    .add(patients::Column::FirstName.contains(term))
                    .add(patients::Column::LastName.contains(term))
                    .add(patients::Column::Ln.contains(term))
                    .add(patients::Column::Hn.contains(term)),
            )
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to match patients")
    }
}
