//! Visit registry API endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::{Visit, VisitStatus, VisitWithPatient};
use crate::services::{VisitInput, VisitQuery};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct VisitBody {
    pub patient_id: Option<i32>,
    pub visit_date: Option<String>,
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

impl TryFrom<VisitBody> for VisitInput {
    type Error = ApiError;

    fn try_from(body: VisitBody) -> Result<Self, Self::Error> {
        let visit_date = match body.visit_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_visit_date(value).ok_or_else(|| {
                ApiError::validation(format!("Invalid visit_date: {value}"))
            })?),
        };

        Ok(Self {
            patient_id: body.patient_id,
            visit_date,
            organization: body.organization,
            other_organization: body.other_organization,
            rights: body.rights,
            weight: body.weight,
            height: body.height,
            blood_pressure: body.blood_pressure,
            pulse: body.pulse,
            medical_history: body.medical_history,
            symptoms: body.symptoms,
            reason: body.reason,
            doctor: body.doctor,
            status: body.status,
        })
    }
}

/// Accepts RFC 3339 timestamps or bare dates (midnight UTC).
fn parse_visit_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

#[derive(Debug, Deserialize)]
pub struct VisitListQuery {
    pub patient_id: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub reference_number: Option<String>,
}

/// `GET /api/visits?patient_id=&search=`
pub async fn list_visits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VisitListQuery>,
) -> Result<Json<ApiResponse<Vec<VisitWithPatient>>>, ApiError> {
    let visits = state
        .registry_service()
        .search_visits(VisitQuery {
            patient_id: query.patient_id,
            search: query.search,
        })
        .await?;
    Ok(Json(ApiResponse::success(visits)))
}

/// `POST /api/visits`
pub async fn create_visit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VisitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let input = VisitInput::try_from(body)?;
    if input.patient_id.is_none() {
        return Err(ApiError::validation("patient_id is required"));
    }

    let visit = state.registry_service().create_visit(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(visit))))
}

/// `GET /api/visits/{reference_number}`
pub async fn get_visit(
    State(state): State<Arc<AppState>>,
    Path(reference_number): Path<String>,
) -> Result<Json<ApiResponse<VisitWithPatient>>, ApiError> {
    let visit = state
        .registry_service()
        .get_visit_by_reference(&reference_number)
        .await?;
    Ok(Json(ApiResponse::success(visit)))
}

/// `PUT /api/visits/id/{id}`
pub async fn update_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<VisitBody>,
) -> Result<Json<ApiResponse<Visit>>, ApiError> {
    let id = validate_id("Visit", id)?;
    let input = VisitInput::try_from(body)?;
    let visit = state.registry_service().update_visit(id, input).await?;
    Ok(Json(ApiResponse::success(visit)))
}

/// `DELETE /api/visits/id/{id}`
pub async fn delete_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id("Visit", id)?;
    state.registry_service().delete_visit(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Visit deleted",
    ))))
}

/// `GET /api/visits/next-reference`
pub async fn next_reference(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ReferenceResponse>>, ApiError> {
    let reference = state.registry_service().next_reference().await?;
    Ok(Json(ApiResponse::success(ReferenceResponse {
        reference_number: Some(reference),
    })))
}

/// `GET /api/visits/last-reference`
pub async fn last_reference(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ReferenceResponse>>, ApiError> {
    let reference = state.registry_service().last_reference().await?;
    Ok(Json(ApiResponse::success(ReferenceResponse {
        reference_number: reference,
    })))
}

/// `GET /api/visits/organizations`
pub async fn organizations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let organizations = state.registry_service().organizations().await?;
    Ok(Json(ApiResponse::success(organizations)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_visit_date() {
        let midnight = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_visit_date("2025-09-01"), Some(midnight));
        assert_eq!(parse_visit_date("2025-09-01T07:00:00+07:00"), Some(midnight));
        assert_eq!(parse_visit_date("yesterday"), None);
    }

    #[test]
    fn test_blank_visit_date_is_ignored() {
        let body = VisitBody {
            patient_id: Some(3),
            visit_date: Some("  ".to_string()),
            ..Default::default()
        };
        let input = VisitInput::try_from(body).unwrap();
        assert_eq!(input.patient_id, Some(3));
        assert!(input.visit_date.is_none());
    }

    #[test]
    fn test_invalid_visit_date_is_rejected() {
        let body = VisitBody {
            visit_date: Some("31/02/2025".to_string()),
            ..Default::default()
        };
        assert!(VisitInput::try_from(body).is_err());
    }
}
