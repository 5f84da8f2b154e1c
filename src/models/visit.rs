use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Patient;
use crate::entities::enums::VisitStatus;
use crate::entities::visits;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub id: i32,
    pub reference_number: String,
    pub patient_id: i32,
    pub visit_date: DateTime<Utc>,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A visit joined with its patient, as returned by lookups and searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitWithPatient {
    #[serde(flatten)]
    pub visit: Visit,
    pub patient: Option<Patient>,
}

impl From<visits::Model> for Visit {
    fn from(model: visits::Model) -> Self {
        Self {
            id: model.id,
            reference_number: model.reference_number,
            patient_id: model.patient_id,
            visit_date: model.visit_date,
            organization: model.organization,
            other_organization: model.other_organization,
            rights: model.rights,
            weight: model.weight,
            height: model.height,
            blood_pressure: model.blood_pressure,
            pulse: model.pulse,
            medical_history: model.medical_history,
            symptoms: model.symptoms,
            reason: model.reason,
            doctor: model.doctor,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
