use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::enums::{OrderPaymentMethod, OrderStatus};
use crate::entities::{order_items, orders};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub lab_group_id: Option<i32>,
    pub name: String,
    pub price: i64,
    pub qty: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: i32,
    pub patient_id: i32,
    pub visit_id: i32,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub payment_method: OrderPaymentMethod,
    pub status: OrderStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            lab_group_id: model.lab_group_id,
            name: model.name,
            price: model.price,
            qty: model.qty,
        }
    }
}

impl Order {
    #[must_use]
    pub fn from_parts(order: orders::Model, items: Vec<order_items::Model>) -> Self {
        Self {
            id: order.id,
            patient_id: order.patient_id,
            visit_id: order.visit_id,
            items: items.into_iter().map(OrderItem::from).collect(),
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            status: order.status,
            completed_at: order.completed_at,
            cancelled_at: order.cancelled_at,
            cancelled_by: order.cancelled_by,
            cancellation_reason: order.cancellation_reason,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
