//! Domain service for the patient and visit registry.
//!
//! Patients and visits receive month-scoped codes from
//! [`crate::domain::sequence`] when they are created.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::sequence::SequenceError;
use crate::models::{Patient, Visit, VisitStatus, VisitWithPatient};

pub const SEARCH_LIMIT: u64 = 50;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Patient {0} not found")]
    PatientNotFound(String),

    #[error("Visit {0} not found")]
    VisitNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SequenceError> for RegistryError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::Exhausted { .. } => Self::Conflict(err.to_string()),
            SequenceError::InvalidPrefix(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for RegistryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RegistryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Patient demographics. On update, `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PatientInput {
    pub hn: Option<String>,
    pub id_card: Option<String>,
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Visit details. On update, `None` leaves a field unchanged and
/// `patient_id` is ignored.
#[derive(Debug, Clone, Default)]
pub struct VisitInput {
    pub patient_id: Option<i32>,
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

#[derive(Debug, Clone, Default)]
pub struct VisitQuery {
    pub patient_id: Option<i32>,
    /// Reference number, or a patient's names, LN or HN.
    pub search: Option<String>,
}

#[async_trait::async_trait]
pub trait RegistryService: Send + Sync {
    /// Registers a patient under the next LN of the current month.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] without first and last names,
    /// [`RegistryError::Conflict`] when no LN could be allocated.
    async fn create_patient(&self, input: PatientInput) -> Result<Patient, RegistryError>;

    async fn update_patient(
        &self,
        patient_id: i32,
        input: PatientInput,
    ) -> Result<Patient, RegistryError>;

    async fn get_patient(&self, patient_id: i32) -> Result<Patient, RegistryError>;

    async fn find_by_id_card(&self, id_card: &str) -> Result<Patient, RegistryError>;

    async fn search_patients(&self, term: Option<&str>) -> Result<Vec<Patient>, RegistryError>;

    /// The LN the next registration would receive right now.
    async fn next_ln(&self) -> Result<String, RegistryError>;

    async fn last_ln(&self) -> Result<Option<String>, RegistryError>;

    /// # Errors
    ///
    /// [`RegistryError::PatientNotFound`] when the patient does not exist.
    async fn create_visit(&self, input: VisitInput) -> Result<VisitWithPatient, RegistryError>;

    async fn update_visit(&self, visit_id: i32, input: VisitInput) -> Result<Visit, RegistryError>;

    async fn delete_visit(&self, visit_id: i32) -> Result<(), RegistryError>;

    async fn get_visit_by_reference(
        &self,
        reference_number: &str,
    ) -> Result<VisitWithPatient, RegistryError>;

    async fn search_visits(&self, query: VisitQuery) -> Result<Vec<VisitWithPatient>, RegistryError>;

    async fn next_reference(&self) -> Result<String, RegistryError>;

    /// Highest reference number issued this month.
    async fn last_reference(&self) -> Result<Option<String>, RegistryError>;

    async fn organizations(&self) -> Result<Vec<String>, RegistryError>;
}
