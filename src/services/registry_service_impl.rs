//! `SeaORM` implementation of the `RegistryService` trait.

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use tracing::{info, warn};

use crate::db::repositories::{NewPatient, NewVisit};
use crate::db::{Store, is_unique_violation};
use crate::domain::sequence;
use crate::models::{Patient, Visit, VisitWithPatient};
use crate::services::registry_service::{
    PatientInput, RegistryError, RegistryService, SEARCH_LIMIT, VisitInput, VisitQuery,
};
use crate::services::validation;

pub struct SeaOrmRegistryService {
    store: Store,
    offset: FixedOffset,
    max_attempts: u32,
}

impl SeaOrmRegistryService {
    #[must_use]
    pub const fn new(store: Store, offset: FixedOffset, max_attempts: u32) -> Self {
        Self {
            store,
            offset,
            max_attempts,
        }
    }

    /// `YYMM` of the current date in the clinic's timezone.
    fn current_prefix(&self) -> String {
        sequence::scope_prefix(Utc::now().with_timezone(&self.offset).date_naive())
    }

    async fn allocate_ln(&self, prefix: &str) -> Result<String, RegistryError> {
        let existing = self.store.patients().ln_codes_with_prefix(prefix).await?;
        Ok(sequence::allocate_next_code(
            prefix,
            existing.iter().map(String::as_str),
        )?)
    }

    async fn allocate_reference(&self, prefix: &str) -> Result<String, RegistryError> {
        let existing = self
            .store
            .visits()
            .reference_codes_with_prefix(prefix)
            .await?;
        Ok(sequence::allocate_next_code(
            prefix,
            existing.iter().map(String::as_str),
        )?)
    }

    fn exhausted_attempts(&self, kind: &str) -> RegistryError {
        RegistryError::Conflict(format!(
            "Could not allocate a unique {kind} after {} attempts",
            self.max_attempts
        ))
    }
}

fn record_retry(sequence: &'static str) {
    metrics::counter!("sequence_allocation_retries_total", "sequence" => sequence).increment(1);
}

fn validate_vitals(input: &VisitInput) -> Result<(), RegistryError> {
    validation::non_negative("Weight", input.weight).map_err(RegistryError::Validation)?;
    validation::non_negative("Height", input.height).map_err(RegistryError::Validation)?;
    validation::non_negative("Pulse", input.pulse).map_err(RegistryError::Validation)?;
    Ok(())
}

fn to_visit_with_patient(
    (visit, patient): (crate::entities::visits::Model, Option<crate::entities::patients::Model>),
) -> VisitWithPatient {
    VisitWithPatient {
        visit: visit.into(),
        patient: patient.map(Patient::from),
    }
}

#[async_trait]
impl RegistryService for SeaOrmRegistryService {
    async fn create_patient(&self, input: PatientInput) -> Result<Patient, RegistryError> {
        let first_name = validation::required("First name", input.first_name.as_deref().unwrap_or_default())
            .map_err(RegistryError::Validation)?;
        let last_name = validation::required("Last name", input.last_name.as_deref().unwrap_or_default())
            .map_err(RegistryError::Validation)?;
        validation::non_negative("Age", input.age).map_err(RegistryError::Validation)?;

        let patient = NewPatient {
            hn: validation::blank_to_none(input.hn),
            id_card: validation::blank_to_none(input.id_card),
            prefix: validation::blank_to_none(input.prefix),
            first_name,
            last_name,
            age: input.age,
            gender: validation::blank_to_none(input.gender),
            birth_date: input.birth_date,
            phone: validation::blank_to_none(input.phone),
            address: validation::blank_to_none(input.address),
        };

        let prefix = self.current_prefix();

        for attempt in 1..=self.max_attempts {
            let ln = self.allocate_ln(&prefix).await?;

            match self
                .store
                .patients()
                .insert(patient.clone(), ln.clone(), Utc::now())
                .await
            {
                Ok(model) => {
                    info!(patient_id = model.id, ln = %ln, "Patient registered");
                    return Ok(model.into());
                }
                Err(err) if is_unique_violation(&err) => {
                    record_retry("ln");
                    warn!(ln = %ln, attempt, "LN already taken, retrying allocation");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted_attempts("LN"))
    }

    async fn update_patient(
        &self,
        patient_id: i32,
        input: PatientInput,
    ) -> Result<Patient, RegistryError> {
        let patients = self.store.patients();
        let existing = patients
            .get_by_id(patient_id)
            .await?
            .ok_or_else(|| RegistryError::PatientNotFound(patient_id.to_string()))?;

        validation::non_negative("Age", input.age).map_err(RegistryError::Validation)?;

        let mut model = existing.into_active_model();
        if let Some(first_name) = input.first_name {
            model.first_name = Set(validation::required("First name", &first_name)
                .map_err(RegistryError::Validation)?);
        }
        if let Some(last_name) = input.last_name {
            model.last_name = Set(validation::required("Last name", &last_name)
                .map_err(RegistryError::Validation)?);
        }
        if input.hn.is_some() {
            model.hn = Set(validation::blank_to_none(input.hn));
        }
        if input.id_card.is_some() {
            model.id_card = Set(validation::blank_to_none(input.id_card));
        }
        if input.prefix.is_some() {
            model.prefix = Set(validation::blank_to_none(input.prefix));
        }
        if input.age.is_some() {
            model.age = Set(input.age);
        }
        if input.gender.is_some() {
            model.gender = Set(validation::blank_to_none(input.gender));
        }
        if input.birth_date.is_some() {
            model.birth_date = Set(input.birth_date);
        }
        if input.phone.is_some() {
            model.phone = Set(validation::blank_to_none(input.phone));
        }
        if input.address.is_some() {
            model.address = Set(validation::blank_to_none(input.address));
        }
        model.updated_at = Set(Utc::now());

        let updated = patients.update(model).await?;

        info!(patient_id, "Patient updated");
        Ok(updated.into())
    }

    async fn get_patient(&self, patient_id: i32) -> Result<Patient, RegistryError> {
        self.store
            .patients()
            .get_by_id(patient_id)
            .await?
            .map(Patient::from)
            .ok_or_else(|| RegistryError::PatientNotFound(patient_id.to_string()))
    }

    async fn find_by_id_card(&self, id_card: &str) -> Result<Patient, RegistryError> {
        if id_card.trim().is_empty() {
            return Err(RegistryError::Validation("ID card number is required".to_string()));
        }

        self.store
            .patients()
            .get_by_id_card(id_card)
            .await?
            .map(Patient::from)
            .ok_or_else(|| RegistryError::PatientNotFound(id_card.trim().to_string()))
    }

    async fn search_patients(&self, term: Option<&str>) -> Result<Vec<Patient>, RegistryError> {
        let patients = self.store.patients().search(term, SEARCH_LIMIT).await?;
        Ok(patients.into_iter().map(Patient::from).collect())
    }

    async fn next_ln(&self) -> Result<String, RegistryError> {
        self.allocate_ln(&self.current_prefix()).await
    }

    async fn last_ln(&self) -> Result<Option<String>, RegistryError> {
        Ok(self.store.patients().last_ln().await?)
    }

    async fn create_visit(&self, input: VisitInput) -> Result<VisitWithPatient, RegistryError> {
        let patient_id = input
            .patient_id
            .ok_or_else(|| RegistryError::Validation("Patient ID is required".to_string()))?;
        validate_vitals(&input)?;

        let patient = self
            .store
            .patients()
            .get_by_id(patient_id)
            .await?
            .ok_or_else(|| RegistryError::PatientNotFound(patient_id.to_string()))?;

        let visit = NewVisit {
            patient_id,
            visit_date: input.visit_date,
            organization: validation::blank_to_none(input.organization),
            other_organization: validation::blank_to_none(input.other_organization),
            rights: validation::blank_to_none(input.rights),
            weight: input.weight,
            height: input.height,
            blood_pressure: validation::blank_to_none(input.blood_pressure),
            pulse: input.pulse,
            medical_history: validation::blank_to_none(input.medical_history),
            symptoms: validation::blank_to_none(input.symptoms),
            reason: validation::blank_to_none(input.reason),
            doctor: validation::blank_to_none(input.doctor),
            status: input.status,
        };

        let prefix = self.current_prefix();

        for attempt in 1..=self.max_attempts {
            let reference = self.allocate_reference(&prefix).await?;

            match self
                .store
                .visits()
                .insert(visit.clone(), reference.clone(), Utc::now())
                .await
            {
                Ok(model) => {
                    info!(
                        visit_id = model.id,
                        patient_id,
                        reference_number = %reference,
                        "Visit recorded"
                    );
                    return Ok(VisitWithPatient {
                        visit: model.into(),
                        patient: Some(patient.into()),
                    });
                }
                Err(err) if is_unique_violation(&err) => {
                    record_retry("visit_reference");
                    warn!(
                        reference_number = %reference,
                        attempt,
                        "Reference number already taken, retrying allocation"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted_attempts("reference number"))
    }

    async fn update_visit(&self, visit_id: i32, input: VisitInput) -> Result<Visit, RegistryError> {
        validate_vitals(&input)?;

        let visits = self.store.visits();
        let existing = visits
            .get_by_id(visit_id)
            .await?
            .ok_or_else(|| RegistryError::VisitNotFound(visit_id.to_string()))?;

        let mut model = existing.into_active_model();
        if let Some(visit_date) = input.visit_date {
            model.visit_date = Set(visit_date);
        }
        if input.organization.is_some() {
            model.organization = Set(validation::blank_to_none(input.organization));
        }
        if input.other_organization.is_some() {
            model.other_organization = Set(validation::blank_to_none(input.other_organization));
        }
        if input.rights.is_some() {
            model.rights = Set(validation::blank_to_none(input.rights));
        }
        if input.weight.is_some() {
            model.weight = Set(input.weight);
        }
        if input.height.is_some() {
            model.height = Set(input.height);
        }
        if input.blood_pressure.is_some() {
            model.blood_pressure = Set(validation::blank_to_none(input.blood_pressure));
        }
        if input.pulse.is_some() {
            model.pulse = Set(input.pulse);
        }
        if input.medical_history.is_some() {
            model.medical_history = Set(validation::blank_to_none(input.medical_history));
        }
        if input.symptoms.is_some() {
            model.symptoms = Set(validation::blank_to_none(input.symptoms));
        }
        if input.reason.is_some() {
            model.reason = Set(validation::blank_to_none(input.reason));
        }
        if input.doctor.is_some() {
            model.doctor = Set(validation::blank_to_none(input.doctor));
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());

        let updated = visits.update(model).await?;

        info!(visit_id, status = ?updated.status, "Visit updated");
        Ok(updated.into())
    }

    async fn delete_visit(&self, visit_id: i32) -> Result<(), RegistryError> {
        if !self.store.visits().delete(visit_id).await? {
            return Err(RegistryError::VisitNotFound(visit_id.to_string()));
        }

        info!(visit_id, "Visit deleted");
        Ok(())
    }

    async fn get_visit_by_reference(
        &self,
        reference_number: &str,
    ) -> Result<VisitWithPatient, RegistryError> {
        self.store
            .visits()
            .get_by_reference(reference_number)
            .await?
            .map(to_visit_with_patient)
            .ok_or_else(|| RegistryError::VisitNotFound(reference_number.trim().to_string()))
    }

    async fn search_visits(&self, query: VisitQuery) -> Result<Vec<VisitWithPatient>, RegistryError> {
        let term = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let matching_patients = match (query.patient_id, term) {
            (None, Some(term)) => self.store.patients().ids_matching(term).await?,
            _ => Vec::new(),
        };

        let visits = self
            .store
            .visits()
            .search(query.patient_id, term, &matching_patients, SEARCH_LIMIT)
            .await?;

        Ok(visits.into_iter().map(to_visit_with_patient).collect())
    }

    async fn next_reference(&self) -> Result<String, RegistryError> {
        self.allocate_reference(&self.current_prefix()).await
    }

    async fn last_reference(&self) -> Result<Option<String>, RegistryError> {
        let prefix = self.current_prefix();
        let existing = self
            .store
            .visits()
            .reference_codes_with_prefix(&prefix)
            .await?;

        let max = sequence::current_max(&prefix, existing.iter().map(String::as_str))?;
        Ok(max.map(|n| sequence::format_code(&prefix, n)))
    }

    async fn organizations(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.store.visits().organizations().await?)
    }
}
