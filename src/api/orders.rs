//! Lab order endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::db::repositories::OrderFilter;
use crate::models::{Order, OrderPaymentMethod};
use crate::services::{CancelRequest, OrderError, OrderLine, OrderRequest};

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => Self::not_found("Order", id),
            OrderError::VisitNotFound(id) => Self::not_found("Visit", id),
            OrderError::LabGroupNotFound(id) => Self::not_found("Lab group", id),
            OrderError::InvalidCredentials => {
                Self::Unauthorized("Invalid username or password".to_string())
            }
            OrderError::Validation(msg) => Self::validation(msg),
            OrderError::StateConflict(msg) => Self::Conflict(msg),
            OrderError::Database(msg) => Self::DatabaseError(msg),
            OrderError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderLineBody {
    pub lab_group_id: i32,
    #[serde(default = "default_qty")]
    pub qty: i32,
}

const fn default_qty() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub patient_id: Option<i32>,
    pub visit_id: i32,
    #[serde(default)]
    pub items: Vec<OrderLineBody>,
    #[serde(default)]
    pub payment_method: OrderPaymentMethod,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CancelOrderBody {
    pub reason: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub visit_id: Option<i32>,
    pub patient_id: Option<i32>,
}

/// `GET /api/orders?visit_id=&patient_id=`
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state
        .order_service()
        .list_orders(OrderFilter {
            visit_id: query.visit_id,
            patient_id: query.patient_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse, ApiError> {
    let visit_id = validate_id("Visit", body.visit_id)?;
    let request = OrderRequest {
        patient_id: body.patient_id,
        visit_id,
        lines: body
            .items
            .into_iter()
            .map(|line| OrderLine {
                lab_group_id: line.lab_group_id,
                qty: line.qty,
            })
            .collect(),
        payment_method: body.payment_method,
    };

    let order = state.order_service().create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// `GET /api/orders/{id}`
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id("Order", id)?;
    let order = state.order_service().get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// `PUT /api/orders/{id}/start`
pub async fn start_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id("Order", id)?;
    let order = state.order_service().start_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// `PUT /api/orders/{id}/complete`
pub async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id("Order", id)?;
    let order = state.order_service().complete_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// `PUT /api/orders/{id}/cancel`
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id("Order", id)?;
    let order = state
        .order_service()
        .cancel_order(
            id,
            CancelRequest {
                reason: body.reason,
                username: body.username,
                password: body.password,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
