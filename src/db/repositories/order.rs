use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::enums::{OrderPaymentMethod, OrderStatus};
use crate::entities::{order_items, orders};
use crate::models::{Order, OrderItem};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub patient_id: i32,
    pub visit_id: i32,
    pub total_amount: i64,
    pub payment_method: OrderPaymentMethod,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub visit_id: Option<i32>,
    pub patient_id: Option<i32>,
}

pub struct OrderRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Inserts the order and its items. Run inside a transaction.
    pub async fn insert(
        &self,
        order: NewOrder,
        items: &[OrderItem],
        now: DateTime<Utc>,
    ) -> Result<(orders::Model, Vec<order_items::Model>)> {
        let order = orders::ActiveModel {
            patient_id: Set(order.patient_id),
            visit_id: Set(order.visit_id),
            total_amount: Set(order.total_amount),
            payment_method: Set(order.payment_method),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert order")?;

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let model = order_items::ActiveModel {
                order_id: Set(order.id),
                lab_group_id: Set(item.lab_group_id),
                name: Set(item.name.clone()),
                price: Set(item.price),
                qty: Set(item.qty),
                ..Default::default()
            }
            .insert(self.conn)
            .await
            .context("Failed to insert order item")?;
            stored.push(model);
        }

        Ok((order, stored))
    }

    pub async fn get_by_id(
        &self,
        id: i32,
    ) -> Result<Option<(orders::Model, Vec<order_items::Model>)>> {
        let mut found = orders::Entity::find()
            .filter(orders::Column::Id.eq(id))
            .find_with_related(order_items::Entity)
            .all(self.conn)
            .await
            .context("Failed to query order by ID")?;

        Ok(found.pop())
    }

    /// Orders with their items, newest first.
    pub async fn list(
        &self,
        filter: OrderFilter,
        limit: u64,
    ) -> Result<Vec<(orders::Model, Vec<order_items::Model>)>> {
        let mut query = orders::Entity::find();
        if let Some(visit_id) = filter.visit_id {
            query = query.filter(orders::Column::VisitId.eq(visit_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query = query.filter(orders::Column::PatientId.eq(patient_id));
        }

        // Limit the orders first; a joined limit would count item rows.
        let ids: Vec<i32> = query
            .select_only()
            .column(orders::Column::Id)
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .limit(limit)
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to list orders")?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        orders::Entity::find()
            .filter(orders::Column::Id.is_in(ids))
            .find_with_related(order_items::Entity)
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to load order items")
    }

    pub async fn statuses_for_visit(&self, visit_id: i32) -> Result<Vec<OrderStatus>> {
        orders::Entity::find()
            .select_only()
            .column(orders::Column::Status)
            .filter(orders::Column::VisitId.eq(visit_id))
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load order statuses")
    }

    /// Persists the lifecycle fields of `order`; items never change.
    pub async fn save(&self, order: &Order) -> Result<()> {
        orders::ActiveModel {
            id: Set(order.id),
            status: Set(order.status),
            completed_at: Set(order.completed_at),
            cancelled_at: Set(order.cancelled_at),
            cancelled_by: Set(order.cancelled_by.clone()),
            cancellation_reason: Set(order.cancellation_reason.clone()),
            updated_at: Set(order.updated_at),
            ..Default::default()
        }
        .update(self.conn)
        .await
        .context("Failed to update order")?;

        Ok(())
    }
}
