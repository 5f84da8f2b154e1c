//! Domain service for the lab catalogue and recorded results.
//!
//! Lab tests are the individual measurements; lab groups bundle tests into
//! the priced panels that orders are placed in.

use thiserror::Error;

use crate::models::{LabGroup, LabResult, LabTest};

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Lab test {0} not found")]
    TestNotFound(i32),

    #[error("Lab group {0} not found")]
    GroupNotFound(i32),

    #[error("Lab result {0} not found")]
    ResultNotFound(i32),

    #[error("Visit {0} not found")]
    VisitNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LabError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LabError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Catalogue test fields. On update, `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct LabTestInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
}

/// Catalogue group fields. On update, `None` leaves a field unchanged and
/// `Some(test_ids)` replaces the member list.
#[derive(Debug, Clone, Default)]
pub struct LabGroupInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub price: Option<i64>,
    pub test_ids: Option<Vec<i32>>,
}

/// A measured value. On update, `visit_id` and `lab_test_id` are ignored.
#[derive(Debug, Clone, Default)]
pub struct LabResultInput {
    pub visit_id: Option<i32>,
    pub lab_test_id: Option<i32>,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub note: Option<String>,
}

#[async_trait::async_trait]
pub trait LabService: Send + Sync {
    async fn list_tests(&self) -> Result<Vec<LabTest>, LabError>;

    /// # Errors
    ///
    /// [`LabError::Conflict`] when the code is already in the catalogue.
    async fn create_test(&self, input: LabTestInput) -> Result<LabTest, LabError>;

    async fn update_test(&self, test_id: i32, input: LabTestInput) -> Result<LabTest, LabError>;

    /// Removes the test from the catalogue and from every group.
    ///
    /// # Errors
    ///
    /// [`LabError::Conflict`] while results recorded against it exist.
    async fn delete_test(&self, test_id: i32) -> Result<(), LabError>;

    async fn list_groups(&self) -> Result<Vec<LabGroup>, LabError>;

    async fn get_group(&self, group_id: i32) -> Result<LabGroup, LabError>;

    async fn create_group(&self, input: LabGroupInput) -> Result<LabGroup, LabError>;

    async fn update_group(&self, group_id: i32, input: LabGroupInput)
    -> Result<LabGroup, LabError>;

    /// Past order items keep their name and price.
    async fn delete_group(&self, group_id: i32) -> Result<(), LabError>;

    /// Newest first; `visit_id` narrows to one visit.
    async fn list_results(&self, visit_id: Option<i32>) -> Result<Vec<LabResult>, LabError>;

    async fn record_result(&self, input: LabResultInput) -> Result<LabResult, LabError>;

    async fn update_result(
        &self,
        result_id: i32,
        input: LabResultInput,
    ) -> Result<LabResult, LabError>;
}
