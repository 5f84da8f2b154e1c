use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::enums::VisitStatus;
use crate::entities::{patients, visits};

#[derive(Debug, Clone, Default)]
pub struct NewVisit {
    pub patient_id: i32,
    pub visit_date: Option<DateTime<Utc>>,
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
    pub status: Option<VisitStatus>,
}

pub struct VisitRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> VisitRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<visits::Model>> {
        visits::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query visit by ID")
    }

    pub async fn get_by_reference(
        &self,
        reference_number: &str,
    ) -> Result<Option<(visits::Model, Option<patients::Model>)>> {
        visits::Entity::find()
            .filter(visits::Column::ReferenceNumber.eq(reference_number.trim()))
            .find_also_related(patients::Entity)
            .one(self.conn)
            .await
            .context("Failed to query visit by reference number")
    }

    pub async fn reference_codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        visits::Entity::find()
            .select_only()
            .column(visits::Column::ReferenceNumber)
            .filter(visits::Column::ReferenceNumber.starts_with(prefix))
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load reference numbers")
    }

    /// Inserts with an already allocated reference number. See
    /// `PatientRepository::insert` for why the raw `DbErr` is returned.
    pub async fn insert(
        &self,
        visit: NewVisit,
        reference_number: String,
        now: DateTime<Utc>,
    ) -> Result<visits::Model, DbErr> {
        let model = visits::ActiveModel {
            reference_number: Set(reference_number),
            patient_id: Set(visit.patient_id),
            visit_date: Set(visit.visit_date.unwrap_or(now)),
            organization: Set(visit.organization),
            other_organization: Set(visit.other_organization),
            rights: Set(visit.rights),
            weight: Set(visit.weight),
            height: Set(visit.height),
            blood_pressure: Set(visit.blood_pressure),
            pulse: Set(visit.pulse),
            medical_history: Set(visit.medical_history),
            symptoms: Set(visit.symptoms),
            reason: Set(visit.reason),
            doctor: Set(visit.doctor),
            status: Set(visit.status.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(self.conn).await
    }

    pub async fn update(&self, model: visits::ActiveModel) -> Result<visits::Model> {
        model
            .update(self.conn)
            .await
            .context("Failed to update visit")
    }

    pub async fn set_status(&self, id: i32, status: VisitStatus, now: DateTime<Utc>) -> Result<()> {
        visits::ActiveModel {
            id: Set(id),
            status: Set(status),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(self.conn)
        .await
        .context("Failed to update visit status")?;

        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = visits::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete visit")?;

        Ok(result.rows_affected > 0)
    }

    /// Visits with their patients, newest visit first.
    ///
    /// `patient_id` takes precedence over `term`. `term` matches the
    /// reference number or any of `matching_patients`.
    pub async fn search(
        &self,
        patient_id: Option<i32>,
        term: Option<&str>,
        matching_patients: &[i32],
        limit: u64,
    ) -> Result<Vec<(visits::Model, Option<patients::Model>)>> {
        let mut query = visits::Entity::find();

        if let Some(patient_id) = patient_id {
            query = query.filter(visits::Column::PatientId.eq(patient_id));
        } else if let Some(term) = term {
            let mut condition =
                Condition::any().add(visits::Column::ReferenceNumber.contains(term));
            if !matching_patients.is_empty() {
                condition =
                    condition.add(visits::Column::PatientId.is_in(matching_patients.iter().copied()));
            }
            query = query.filter(condition);
        }

        query
            .find_also_related(patients::Entity)
            .order_by_desc(visits::Column::VisitDate)
            .order_by_desc(visits::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
            .context("Failed to search visits")
    }

    /// Distinct non-blank organizations, sorted.
    pub async fn organizations(&self) -> Result<Vec<String>> {
        let organizations: Vec<Option<String>> = visits::Entity::find()
            .select_only()
            .column(visits::Column::Organization)
            .distinct()
            .filter(visits::Column::Organization.is_not_null())
            .order_by_asc(visits::Column::Organization)
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to list organizations")?;

        Ok(organizations
            .into_iter()
            .flatten()
            .filter(|org| !org.trim().is_empty())
            .collect())
    }
}
