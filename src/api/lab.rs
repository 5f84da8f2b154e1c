//! Lab catalogue and result endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::{LabGroup, LabResult, LabTest};
use crate::services::{LabError, LabGroupInput, LabResultInput, LabTestInput};

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        match err {
            LabError::TestNotFound(id) => Self::not_found("Lab test", id),
            LabError::GroupNotFound(id) => Self::not_found("Lab group", id),
            LabError::ResultNotFound(id) => Self::not_found("Lab result", id),
            LabError::VisitNotFound(id) => Self::not_found("Visit", id),
            LabError::Validation(msg) => Self::validation(msg),
            LabError::Conflict(msg) => Self::Conflict(msg),
            LabError::Database(msg) => Self::DatabaseError(msg),
            LabError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LabTestBody {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
}

impl From<LabTestBody> for LabTestInput {
    fn from(body: LabTestBody) -> Self {
        Self {
            code: body.code,
            name: body.name,
            category: body.category,
            price: body.price,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LabGroupBody {
    pub code: Option<String>,
    pub name: Option<String>,
    pub price: Option<i64>,
    pub test_ids: Option<Vec<i32>>,
}

impl From<LabGroupBody> for LabGroupInput {
    fn from(body: LabGroupBody) -> Self {
        Self {
            code: body.code,
            name: body.name,
            price: body.price,
            test_ids: body.test_ids,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LabResultBody {
    pub visit_id: Option<i32>,
    pub lab_test_id: Option<i32>,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub note: Option<String>,
}

impl From<LabResultBody> for LabResultInput {
    fn from(body: LabResultBody) -> Self {
        Self {
            visit_id: body.visit_id,
            lab_test_id: body.lab_test_id,
            result_value: body.result_value,
            unit: body.unit,
            normal_range: body.normal_range,
            note: body.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LabResultQuery {
    pub visit_id: Option<i32>,
}

/// `GET /api/lab-items`
pub async fn list_tests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<LabTest>>>, ApiError> {
    let tests = state.lab_service().list_tests().await?;
    Ok(Json(ApiResponse::success(tests)))
}

/// `POST /api/lab-items`
pub async fn create_test(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LabTestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let test = state.lab_service().create_test(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(test))))
}

/// `PUT /api/lab-items/{id}`
pub async fn update_test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<LabTestBody>,
) -> Result<Json<ApiResponse<LabTest>>, ApiError> {
    let id = validate_id("Lab test", id)?;
    let test = state.lab_service().update_test(id, body.into()).await?;
    Ok(Json(ApiResponse::success(test)))
}

/// `DELETE /api/lab-items/{id}`
pub async fn delete_test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id("Lab test", id)?;
    state.lab_service().delete_test(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Lab test deleted",
    ))))
}

/// `GET /api/lab-groups`
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<LabGroup>>>, ApiError> {
    let groups = state.lab_service().list_groups().await?;
    Ok(Json(ApiResponse::success(groups)))
}

/// `GET /api/lab-groups/{id}`
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LabGroup>>, ApiError> {
    let id = validate_id("Lab group", id)?;
    let group = state.lab_service().get_group(id).await?;
    Ok(Json(ApiResponse::success(group)))
}

/// `POST /api/lab-groups`
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LabGroupBody>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.lab_service().create_group(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

/// `PUT /api/lab-groups/{id}`
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<LabGroupBody>,
) -> Result<Json<ApiResponse<LabGroup>>, ApiError> {
    let id = validate_id("Lab group", id)?;
    let group = state.lab_service().update_group(id, body.into()).await?;
    Ok(Json(ApiResponse::success(group)))
}

/// `DELETE /api/lab-groups/{id}`
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id("Lab group", id)?;
    state.lab_service().delete_group(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Lab group deleted",
    ))))
}

/// `GET /api/lab-results?visit_id=`
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LabResultQuery>,
) -> Result<Json<ApiResponse<Vec<LabResult>>>, ApiError> {
    let results = state.lab_service().list_results(query.visit_id).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// `GET /api/lab-results/visit/{visit_id}`
pub async fn results_for_visit(
    State(state): State<Arc<AppState>>,
    Path(visit_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<LabResult>>>, ApiError> {
    let visit_id = validate_id("Visit", visit_id)?;
    let results = state.lab_service().list_results(Some(visit_id)).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// `POST /api/lab-results`
pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LabResultBody>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.lab_service().record_result(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// `PUT /api/lab-results/{id}`
pub async fn update_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<LabResultBody>,
) -> Result<Json<ApiResponse<LabResult>>, ApiError> {
    let id = validate_id("Lab result", id)?;
    let result = state.lab_service().update_result(id, body.into()).await?;
    Ok(Json(ApiResponse::success(result)))
}
