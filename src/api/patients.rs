//! Patient registry API endpoints.
//!
//! Mounted behind the subscription gate. Handlers only map HTTP to
//! [`RegistryService`](crate::services::RegistryService) calls.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::models::Patient;
use crate::services::{PatientInput, RegistryError};

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::PatientNotFound(id) => Self::not_found("Patient", id),
            RegistryError::VisitNotFound(id) => Self::not_found("Visit", id),
            RegistryError::Validation(msg) => Self::validation(msg),
            RegistryError::Conflict(msg) => Self::Conflict(msg),
            RegistryError::Database(msg) => Self::DatabaseError(msg),
            RegistryError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PatientBody {
    pub hn: Option<String>,
    pub id_card: Option<String>,
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; empty or unparsable values are dropped.
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<PatientBody> for PatientInput {
    fn from(body: PatientBody) -> Self {
        Self {
            hn: body.hn,
            id_card: body.id_card,
            prefix: body.prefix,
            first_name: body.first_name,
            last_name: body.last_name,
            age: body.age,
            gender: body.gender,
            birth_date: body.birth_date.as_deref().and_then(parse_birth_date),
            phone: body.phone,
            address: body.address,
        }
    }
}

fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[derive(Debug, Deserialize)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdCardQuery {
    pub id_card: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LnResponse {
    pub ln: Option<String>,
}

/// `GET /api/patients?search=`
///
/// Up to 50 patients matching HN, names, ID card or LN.
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<ApiResponse<Vec<Patient>>>, ApiError> {
    let patients = state
        .registry_service()
        .search_patients(query.search.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(patients)))
}

/// `GET /api/patients/search?id_card=`
pub async fn find_by_id_card(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdCardQuery>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let id_card = query.id_card.unwrap_or_default();
    let patient = state.registry_service().find_by_id_card(&id_card).await?;
    Ok(Json(ApiResponse::success(patient)))
}

/// `POST /api/patients`
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PatientBody>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.registry_service().create_patient(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(patient))))
}

/// `GET /api/patients/{id}`
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let id = validate_id("Patient", id)?;
    let patient = state.registry_service().get_patient(id).await?;
    Ok(Json(ApiResponse::success(patient)))
}

/// `PUT /api/patients/{id}`
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<PatientBody>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let id = validate_id("Patient", id)?;
    let patient = state
        .registry_service()
        .update_patient(id, body.into())
        .await?;
    Ok(Json(ApiResponse::success(patient)))
}

/// `GET /api/patients/next-ln`
pub async fn next_ln(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<LnResponse>>, ApiError> {
    let ln = state.registry_service().next_ln().await?;
    Ok(Json(ApiResponse::success(LnResponse { ln: Some(ln) })))
}

/// `GET /api/patients/last-ln`
pub async fn last_ln(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<LnResponse>>, ApiError> {
    let ln = state.registry_service().last_ln().await?;
    Ok(Json(ApiResponse::success(LnResponse { ln })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_birth_date() {
        let expected = NaiveDate::from_ymd_opt(1990, 4, 12);
        assert_eq!(parse_birth_date("1990-04-12"), expected);
        assert_eq!(parse_birth_date("1990-04-12T00:00:00Z"), expected);
        assert_eq!(parse_birth_date(""), None);
        assert_eq!(parse_birth_date("not a date"), None);
    }
}
