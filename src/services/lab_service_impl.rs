//! `SeaORM` implementation of the `LabService` trait.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveValue::Set, DbErr, IntoActiveModel};
use tracing::info;

use crate::db::repositories::{LabRepository, NewLabGroup, NewLabResult, NewLabTest};
use crate::db::{Store, is_unique_violation};
use crate::models::{LabGroup, LabResult, LabTest};
use crate::services::lab_service::{
    LabError, LabGroupInput, LabResultInput, LabService, LabTestInput,
};
use crate::services::registry_service::SEARCH_LIMIT;
use crate::services::validation;

const RESULTS_LIMIT: u64 = SEARCH_LIMIT * 4;

pub struct SeaOrmLabService {
    store: Store,
}

impl SeaOrmLabService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load_group(&self, group_id: i32) -> Result<LabGroup, LabError> {
        self.store
            .labs()
            .get_group(group_id)
            .await?
            .map(|(group, tests)| LabGroup::from_parts(group, tests))
            .ok_or(LabError::GroupNotFound(group_id))
    }

    async fn load_result(&self, result_id: i32) -> Result<LabResult, LabError> {
        let labs = self.store.labs();
        let result = labs
            .get_result(result_id)
            .await?
            .ok_or(LabError::ResultNotFound(result_id))?;
        let test = labs.get_test(result.lab_test_id).await?;
        Ok(LabResult::from_parts(result, test))
    }
}

fn required(field: &str, value: Option<&str>) -> Result<String, LabError> {
    validation::required(field, value.unwrap_or_default()).map_err(LabError::Validation)
}

fn price(value: i64) -> Result<i64, LabError> {
    validation::non_negative("Price", Some(value)).map_err(LabError::Validation)?;
    Ok(value)
}

fn duplicate_code(err: DbErr, code: &str) -> LabError {
    if is_unique_violation(&err) {
        LabError::Conflict(format!("Code {code} is already in the catalogue"))
    } else {
        err.into()
    }
}

/// Sorted, de-duplicated member ids, all of which must exist.
async fn member_ids<C: sea_orm::ConnectionTrait>(
    labs: &LabRepository<'_, C>,
    test_ids: &[i32],
) -> Result<Vec<i32>, LabError> {
    let mut ids = test_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let found: Vec<i32> = labs.tests_by_ids(&ids).await?.iter().map(|t| t.id).collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(LabError::TestNotFound(*missing));
    }
    Ok(ids)
}

#[async_trait]
impl LabService for SeaOrmLabService {
    async fn list_tests(&self) -> Result<Vec<LabTest>, LabError> {
        let tests = self.store.labs().list_tests().await?;
        Ok(tests.into_iter().map(LabTest::from).collect())
    }

    async fn create_test(&self, input: LabTestInput) -> Result<LabTest, LabError> {
        let code = required("Code", input.code.as_deref())?;
        let name = required("Name", input.name.as_deref())?;
        let price = price(
            input
                .price
                .ok_or_else(|| LabError::Validation("Price is required".to_string()))?,
        )?;

        let test = self
            .store
            .labs()
            .insert_test(
                NewLabTest {
                    code: code.clone(),
                    name,
                    category: validation::blank_to_none(input.category),
                    price,
                },
                Utc::now(),
            )
            .await
            .map_err(|e| duplicate_code(e, &code))?;

        info!(lab_test_id = test.id, code = %test.code, "Lab test created");
        Ok(test.into())
    }

    async fn update_test(&self, test_id: i32, input: LabTestInput) -> Result<LabTest, LabError> {
        let labs = self.store.labs();
        let existing = labs
            .get_test(test_id)
            .await?
            .ok_or(LabError::TestNotFound(test_id))?;
        let mut code = existing.code.clone();

        let mut model = existing.into_active_model();
        if let Some(new_code) = input.code {
            code = required("Code", Some(&new_code))?;
            model.code = Set(code.clone());
        }
        if let Some(name) = input.name {
            model.name = Set(required("Name", Some(&name))?);
        }
        if input.category.is_some() {
            model.category = Set(validation::blank_to_none(input.category));
        }
        if let Some(value) = input.price {
            model.price = Set(price(value)?);
        }
        model.updated_at = Set(Utc::now());

        let updated = labs
            .update_test(model)
            .await
            .map_err(|e| duplicate_code(e, &code))?;

        info!(lab_test_id = test_id, "Lab test updated");
        Ok(updated.into())
    }

    async fn delete_test(&self, test_id: i32) -> Result<(), LabError> {
        let labs = self.store.labs();

        if labs.count_results_for_test(test_id).await? > 0 {
            return Err(LabError::Conflict(format!(
                "Lab test {test_id} has recorded results"
            )));
        }
        if !labs.delete_test(test_id).await? {
            return Err(LabError::TestNotFound(test_id));
        }

        info!(lab_test_id = test_id, "Lab test deleted");
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<LabGroup>, LabError> {
        let groups = self.store.labs().list_groups().await?;
        Ok(groups
            .into_iter()
            .map(|(group, tests)| LabGroup::from_parts(group, tests))
            .collect())
    }

    async fn get_group(&self, group_id: i32) -> Result<LabGroup, LabError> {
        self.load_group(group_id).await
    }

    async fn create_group(&self, input: LabGroupInput) -> Result<LabGroup, LabError> {
        let code = required("Code", input.code.as_deref())?;
        let name = required("Name", input.name.as_deref())?;
        let price = price(
            input
                .price
                .ok_or_else(|| LabError::Validation("Price is required".to_string()))?,
        )?;

        let txn = self.store.begin().await?;
        let labs = LabRepository::new(&txn);

        let test_ids = member_ids(&labs, input.test_ids.as_deref().unwrap_or_default()).await?;
        let group = labs
            .insert_group(
                NewLabGroup {
                    code: code.clone(),
                    name,
                    price,
                },
                Utc::now(),
            )
            .await
            .map_err(|e| duplicate_code(e, &code))?;
        labs.set_group_tests(group.id, &test_ids).await?;
        txn.commit().await?;

        info!(lab_group_id = group.id, code = %code, tests = test_ids.len(), "Lab group created");
        self.load_group(group.id).await
    }

    async fn update_group(
        &self,
        group_id: i32,
        input: LabGroupInput,
    ) -> Result<LabGroup, LabError> {
        let txn = self.store.begin().await?;
        let labs = LabRepository::new(&txn);

        let (existing, _) = labs
            .get_group(group_id)
            .await?
            .ok_or(LabError::GroupNotFound(group_id))?;
        let mut code = existing.code.clone();

        let mut model = existing.into_active_model();
        if let Some(new_code) = input.code {
            code = required("Code", Some(&new_code))?;
            model.code = Set(code.clone());
        }
        if let Some(name) = input.name {
            model.name = Set(required("Name", Some(&name))?);
        }
        if let Some(value) = input.price {
            model.price = Set(price(value)?);
        }
        model.updated_at = Set(Utc::now());

        labs.update_group(model)
            .await
            .map_err(|e| duplicate_code(e, &code))?;

        if let Some(test_ids) = input.test_ids {
            let test_ids = member_ids(&labs, &test_ids).await?;
            labs.set_group_tests(group_id, &test_ids).await?;
        }
        txn.commit().await?;

        info!(lab_group_id = group_id, "Lab group updated");
        self.load_group(group_id).await
    }

    async fn delete_group(&self, group_id: i32) -> Result<(), LabError> {
        if !self.store.labs().delete_group(group_id).await? {
            return Err(LabError::GroupNotFound(group_id));
        }

        info!(lab_group_id = group_id, "Lab group deleted");
        Ok(())
    }

    async fn list_results(&self, visit_id: Option<i32>) -> Result<Vec<LabResult>, LabError> {
        let results = self.store.labs().list_results(visit_id, RESULTS_LIMIT).await?;
        Ok(results
            .into_iter()
            .map(|(result, test)| LabResult::from_parts(result, test))
            .collect())
    }

    async fn record_result(&self, input: LabResultInput) -> Result<LabResult, LabError> {
        let visit_id = input
            .visit_id
            .ok_or_else(|| LabError::Validation("visit_id is required".to_string()))?;
        let lab_test_id = input
            .lab_test_id
            .ok_or_else(|| LabError::Validation("lab_test_id is required".to_string()))?;

        if self.store.visits().get_by_id(visit_id).await?.is_none() {
            return Err(LabError::VisitNotFound(visit_id));
        }
        let test = self
            .store
            .labs()
            .get_test(lab_test_id)
            .await?
            .ok_or(LabError::TestNotFound(lab_test_id))?;

        let result = self
            .store
            .labs()
            .insert_result(
                NewLabResult {
                    visit_id,
                    lab_test_id,
                    result_value: validation::blank_to_none(input.result_value),
                    unit: validation::blank_to_none(input.unit),
                    normal_range: validation::blank_to_none(input.normal_range),
                    note: validation::blank_to_none(input.note),
                },
                Utc::now(),
            )
            .await?;

        info!(lab_result_id = result.id, visit_id, code = %test.code, "Lab result recorded");
        Ok(LabResult::from_parts(result, Some(test)))
    }

    async fn update_result(
        &self,
        result_id: i32,
        input: LabResultInput,
    ) -> Result<LabResult, LabError> {
        let labs = self.store.labs();
        let existing = labs
            .get_result(result_id)
            .await?
            .ok_or(LabError::ResultNotFound(result_id))?;

        let mut model = existing.into_active_model();
        if input.result_value.is_some() {
            model.result_value = Set(validation::blank_to_none(input.result_value));
        }
        if input.unit.is_some() {
            model.unit = Set(validation::blank_to_none(input.unit));
        }
        if input.normal_range.is_some() {
            model.normal_range = Set(validation::blank_to_none(input.normal_range));
        }
        if input.note.is_some() {
            model.note = Set(validation::blank_to_none(input.note));
        }
        model.updated_at = Set(Utc::now());
        labs.update_result(model).await?;

        info!(lab_result_id = result_id, "Lab result updated");
        self.load_result(result_id).await
    }
}
