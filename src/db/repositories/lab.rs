use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{lab_group_tests, lab_groups, lab_results, lab_tests};

#[derive(Debug, Clone)]
pub struct NewLabTest {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewLabGroup {
    pub code: String,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewLabResult {
    pub visit_id: i32,
    pub lab_test_id: i32,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub note: Option<String>,
}

/// Lab catalogue (tests and groups) and recorded results.
pub struct LabRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> LabRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn list_tests(&self) -> Result<Vec<lab_tests::Model>> {
        lab_tests::Entity::find()
            .order_by_asc(lab_tests::Column::Code)
            .all(self.conn)
            .await
            .context("Failed to list lab tests")
    }

    pub async fn get_test(&self, id: i32) -> Result<Option<lab_tests::Model>> {
        lab_tests::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query lab test by ID")
    }

    pub async fn tests_by_ids(&self, ids: &[i32]) -> Result<Vec<lab_tests::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        lab_tests::Entity::find()
            .filter(lab_tests::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(lab_tests::Column::Code)
            .all(self.conn)
            .await
            .context("Failed to query lab tests")
    }

    /// Returns the raw `DbErr` so callers can tell a duplicate code apart.
    pub async fn insert_test(
        &self,
        test: NewLabTest,
        now: DateTime<Utc>,
    ) -> Result<lab_tests::Model, DbErr> {
        lab_tests::ActiveModel {
            code: Set(test.code),
            name: Set(test.name),
            category: Set(test.category),
            price: Set(test.price),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn update_test(&self, model: lab_tests::ActiveModel) -> Result<lab_tests::Model, DbErr> {
        model.update(self.conn).await
    }

    pub async fn delete_test(&self, id: i32) -> Result<bool> {
        let result = lab_tests::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete lab test")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_results_for_test(&self, lab_test_id: i32) -> Result<u64> {
        lab_results::Entity::find()
            .filter(lab_results::Column::LabTestId.eq(lab_test_id))
            .count(self.conn)
            .await
            .context("Failed to count lab results")
    }

    /// Every group with its member tests, ordered by group code.
    pub async fn list_groups(&self) -> Result<Vec<(lab_groups::Model, Vec<lab_tests::Model>)>> {
        lab_groups::Entity::find()
            .find_with_related(lab_tests::Entity)
            .order_by_asc(lab_groups::Column::Code)
            .all(self.conn)
            .await
            .context("Failed to list lab groups")
    }

    pub async fn get_group(
        &self,
        id: i32,
    ) -> Result<Option<(lab_groups::Model, Vec<lab_tests::Model>)>> {
        let mut groups = lab_groups::Entity::find()
            .filter(lab_groups::Column::Id.eq(id))
            .find_with_related(lab_tests::Entity)
            .all(self.conn)
            .await
            .context("Failed to query lab group by ID")?;

        Ok(groups.pop())
    }

    pub async fn groups_by_ids(&self, ids: &[i32]) -> Result<Vec<lab_groups::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        lab_groups::Entity::find()
            .filter(lab_groups::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
            .context("Failed to query lab groups")
    }

    /// Returns the raw `DbErr` so callers can tell a duplicate code apart.
    pub async fn insert_group(
        &self,
        group: NewLabGroup,
        now: DateTime<Utc>,
    ) -> Result<lab_groups::Model, DbErr> {
        lab_groups::ActiveModel {
            code: Set(group.code),
            name: Set(group.name),
            price: Set(group.price),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn update_group(
        &self,
        model: lab_groups::ActiveModel,
    ) -> Result<lab_groups::Model, DbErr> {
        model.update(self.conn).await
    }

    /// Replaces the group's member tests.
    pub async fn set_group_tests(&self, lab_group_id: i32, test_ids: &[i32]) -> Result<()> {
        lab_group_tests::Entity::delete_many()
            .filter(lab_group_tests::Column::LabGroupId.eq(lab_group_id))
            .exec(self.conn)
            .await
            .context("Failed to clear lab group members")?;

        if test_ids.is_empty() {
            return Ok(());
        }

        let members = test_ids.iter().map(|&lab_test_id| lab_group_tests::ActiveModel {
            lab_group_id: Set(lab_group_id),
            lab_test_id: Set(lab_test_id),
        });

        lab_group_tests::Entity::insert_many(members)
            .exec(self.conn)
            .await
            .context("Failed to store lab group members")?;

        Ok(())
    }

    pub async fn delete_group(&self, id: i32) -> Result<bool> {
        let result = lab_groups::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete lab group")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn insert_result(
        &self,
        result: NewLabResult,
        now: DateTime<Utc>,
    ) -> Result<lab_results::Model> {
        lab_results::ActiveModel {
            visit_id: Set(result.visit_id),
            lab_test_id: Set(result.lab_test_id),
            result_value: Set(result.result_value),
            unit: Set(result.unit),
            normal_range: Set(result.normal_range),
            note: Set(result.note),
            recorded_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert lab result")
    }

    pub async fn get_result(&self, id: i32) -> Result<Option<lab_results::Model>> {
        lab_results::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query lab result by ID")
    }

    pub async fn update_result(&self, model: lab_results::ActiveModel) -> Result<lab_results::Model> {
        model
            .update(self.conn)
            .await
            .context("Failed to update lab result")
    }

    /// Results with their tests, newest first. `visit_id` narrows to one visit.
    pub async fn list_results(
        &self,
        visit_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<(lab_results::Model, Option<lab_tests::Model>)>> {
        let mut query = lab_results::Entity::find();
        if let Some(visit_id) = visit_id {
            query = query.filter(lab_results::Column::VisitId.eq(visit_id));
        }

        query
            .find_also_related(lab_tests::Entity)
            .order_by_desc(lab_results::Column::RecordedAt)
            .order_by_desc(lab_results::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
            .context("Failed to list lab results")
    }
}
