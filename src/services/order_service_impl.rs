//! `SeaORM` implementation of the `OrderService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use tracing::{info, warn};

use crate::db::Store;
use crate::db::repositories::user::verify_password;
use crate::db::repositories::{
    LabRepository, NewOrder, OrderFilter, OrderRepository, VisitRepository,
};
use crate::domain::ordering;
use crate::models::{Order, OrderItem, VisitStatus};
use crate::services::order_service::{
    CancelRequest, OrderError, OrderRequest, OrderService,
};
use crate::services::registry_service::SEARCH_LIMIT;
use crate::services::validation;

pub struct SeaOrmOrderService {
    store: Store,
}

impl SeaOrmOrderService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Applies `transition` to the order and re-derives its visit's status,
    /// all in one transaction.
    async fn transition<F>(&self, order_id: i32, transition: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order, DateTime<Utc>) -> Result<(), OrderError> + Send,
    {
        let txn = self.store.begin().await?;
        let orders = OrderRepository::new(&txn);

        let (order, items) = orders
            .get_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let mut order = Order::from_parts(order, items);

        let now = Utc::now();
        transition(&mut order, now)?;
        orders.save(&order).await?;
        let visit_status = sync_visit_status(&txn, order.visit_id, now).await?;
        txn.commit().await?;

        info!(
            order_id,
            status = ?order.status,
            visit_id = order.visit_id,
            visit_status = ?visit_status,
            "Order status changed"
        );
        Ok(order)
    }
}

/// Stores the visit status implied by its orders and returns it.
async fn sync_visit_status<C: ConnectionTrait>(
    conn: &C,
    visit_id: i32,
    now: DateTime<Utc>,
) -> Result<VisitStatus, OrderError> {
    let statuses = OrderRepository::new(conn).statuses_for_visit(visit_id).await?;
    let status = ordering::visit_status_for(statuses);
    VisitRepository::new(conn)
        .set_status(visit_id, status, now)
        .await?;
    Ok(status)
}

#[async_trait]
impl OrderService for SeaOrmOrderService {
    async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        let txn = self.store.begin().await?;

        let visit = VisitRepository::new(&txn)
            .get_by_id(request.visit_id)
            .await?
            .ok_or(OrderError::VisitNotFound(request.visit_id))?;

        if let Some(patient_id) = request.patient_id
            && patient_id != visit.patient_id
        {
            return Err(OrderError::Validation(format!(
                "Visit {} does not belong to patient {patient_id}",
                visit.id
            )));
        }

        let group_ids: Vec<i32> = request.lines.iter().map(|l| l.lab_group_id).collect();
        let groups = LabRepository::new(&txn).groups_by_ids(&group_ids).await?;

        let items = request
            .lines
            .iter()
            .map(|line| {
                groups
                    .iter()
                    .find(|g| g.id == line.lab_group_id)
                    .map(|group| OrderItem {
                        lab_group_id: Some(group.id),
                        name: group.name.clone(),
                        price: group.price,
                        qty: line.qty,
                    })
                    .ok_or(OrderError::LabGroupNotFound(line.lab_group_id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = ordering::order_total(&items)?;

        let now = Utc::now();
        let (order, items) = OrderRepository::new(&txn)
            .insert(
                NewOrder {
                    patient_id: visit.patient_id,
                    visit_id: visit.id,
                    total_amount,
                    payment_method: request.payment_method,
                },
                &items,
                now,
            )
            .await?;
        let visit_status = sync_visit_status(&txn, visit.id, now).await?;
        txn.commit().await?;

        info!(
            order_id = order.id,
            visit_id = visit.id,
            total_amount,
            visit_status = ?visit_status,
            "Order placed"
        );
        Ok(Order::from_parts(order, items))
    }

    async fn get_order(&self, order_id: i32) -> Result<Order, OrderError> {
        self.store
            .orders()
            .get_by_id(order_id)
            .await?
            .map(|(order, items)| Order::from_parts(order, items))
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        let orders = self.store.orders().list(filter, SEARCH_LIMIT).await?;
        Ok(orders
            .into_iter()
            .map(|(order, items)| Order::from_parts(order, items))
            .collect())
    }

    async fn start_order(&self, order_id: i32) -> Result<Order, OrderError> {
        self.transition(order_id, |order, now| Ok(ordering::start(order, now)?))
            .await
    }

    async fn complete_order(&self, order_id: i32) -> Result<Order, OrderError> {
        self.transition(order_id, |order, now| Ok(ordering::complete(order, now)?))
            .await
    }

    async fn cancel_order(
        &self,
        order_id: i32,
        request: CancelRequest,
    ) -> Result<Order, OrderError> {
        let reason =
            validation::required("Reason", &request.reason).map_err(OrderError::Validation)?;
        let username =
            validation::required("Username", &request.username).map_err(OrderError::Validation)?;
        if request.password.is_empty() {
            return Err(OrderError::Validation("Password is required".to_string()));
        }

        let user = self
            .store
            .users()
            .get_by_username(&username)
            .await?
            .filter(|user| user.is_active);
        let verified = match user {
            Some(user) => verify_password(&request.password, &user.password_hash).await?,
            None => false,
        };
        if !verified {
            warn!(order_id, username = %username, "Order cancellation with invalid credentials");
            return Err(OrderError::InvalidCredentials);
        }

        self.transition(order_id, move |order, now| {
            Ok(ordering::cancel(order, &username, &reason, now)?)
        })
        .await
    }
}
