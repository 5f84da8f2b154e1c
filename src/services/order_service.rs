//! Domain service for lab orders.
//!
//! Placing, progressing or cancelling an order re-derives the status of its
//! visit in the same transaction (see [`crate::domain::ordering`]).

use thiserror::Error;

use crate::db::repositories::OrderFilter;
use crate::domain::approval::WorkflowError;
use crate::models::{Order, OrderPaymentMethod};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order {0} not found")]
    OrderNotFound(i32),

    #[error("Visit {0} not found")]
    VisitNotFound(i32),

    #[error("Lab group {0} not found")]
    LabGroupNotFound(i32),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<WorkflowError> for OrderError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidArgument(msg) => Self::Validation(msg),
            WorkflowError::StateConflict(msg) => Self::StateConflict(msg),
        }
    }
}

impl From<sea_orm::DbErr> for OrderError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OrderError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderLine {
    pub lab_group_id: i32,
    pub qty: i32,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Defaults to the visit's patient; must match it when given.
    pub patient_id: Option<i32>,
    pub visit_id: i32,
    pub lines: Vec<OrderLine>,
    pub payment_method: OrderPaymentMethod,
}

/// A cancellation is confirmed by re-entering a staff member's credentials.
#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub reason: String,
    pub username: String,
    pub password: String,
}

#[async_trait::async_trait]
pub trait OrderService: Send + Sync {
    /// Places an order priced from the lab group catalogue.
    ///
    /// # Errors
    ///
    /// [`OrderError::VisitNotFound`] or [`OrderError::LabGroupNotFound`] for
    /// unknown references, [`OrderError::Validation`] for an empty order or a
    /// patient that does not own the visit.
    async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError>;

    async fn get_order(&self, order_id: i32) -> Result<Order, OrderError>;

    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError>;

    async fn start_order(&self, order_id: i32) -> Result<Order, OrderError>;

    async fn complete_order(&self, order_id: i32) -> Result<Order, OrderError>;

    /// # Errors
    ///
    /// [`OrderError::InvalidCredentials`] unless the credentials belong to an
    /// enabled account, [`OrderError::StateConflict`] for an order that is
    /// already cancelled or done.
    async fn cancel_order(&self, order_id: i32, request: CancelRequest)
    -> Result<Order, OrderError>;
}
