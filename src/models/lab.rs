use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::{lab_groups, lab_results, lab_tests};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabTest {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub price: i64,
}

/// A priced panel of lab tests, the unit that orders are placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabGroup {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub price: i64,
    pub tests: Vec<LabTest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabResult {
    pub id: i32,
    pub visit_id: i32,
    pub lab_test_id: i32,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub test: Option<LabTest>,
}

impl From<lab_tests::Model> for LabTest {
    fn from(model: lab_tests::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            category: model.category,
            price: model.price,
        }
    }
}

impl LabGroup {
    #[must_use]
    pub fn from_parts(group: lab_groups::Model, tests: Vec<lab_tests::Model>) -> Self {
        Self {
            id: group.id,
            code: group.code,
            name: group.name,
            price: group.price,
            tests: tests.into_iter().map(LabTest::from).collect(),
        }
    }
}

impl LabResult {
    #[must_use]
    pub fn from_parts(result: lab_results::Model, test: Option<lab_tests::Model>) -> Self {
        Self {
            id: result.id,
            visit_id: result.visit_id,
            lab_test_id: result.lab_test_id,
            result_value: result.result_value,
            unit: result.unit,
            normal_range: result.normal_range,
            note: result.note,
            recorded_at: result.recorded_at,
            test: test.map(LabTest::from),
        }
    }
}
