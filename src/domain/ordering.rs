//! Lab order lifecycle.
//!
//! Orders move `pending -> in_progress -> done`, and can be cancelled until
//! they are done. The status of the visit they belong to is derived from its
//! orders rather than stored independently of them.

use chrono::{DateTime, Utc};

use super::approval::WorkflowError;
use crate::entities::enums::{OrderStatus, VisitStatus};
use crate::models::{Order, OrderItem};

/// Sum of `price * qty` over the items.
///
/// # Errors
///
/// [`WorkflowError::InvalidArgument`] for an empty order, a quantity below
/// one, a negative price or a total that overflows.
pub fn order_total(items: &[OrderItem]) -> Result<i64, WorkflowError> {
    if items.is_empty() {
        return Err(WorkflowError::InvalidArgument(
            "An order needs at least one item".to_string(),
        ));
    }

    items.iter().try_fold(0_i64, |total, item| {
        if item.qty < 1 {
            return Err(WorkflowError::InvalidArgument(format!(
                "Quantity of {} must be at least 1",
                item.name
            )));
        }
        if item.price < 0 {
            return Err(WorkflowError::InvalidArgument(format!(
                "Price of {} cannot be negative",
                item.name
            )));
        }

        item.price
            .checked_mul(i64::from(item.qty))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| WorkflowError::InvalidArgument("Order total is too large".to_string()))
    })
}

pub fn start(order: &mut Order, now: DateTime<Utc>) -> Result<(), WorkflowError> {
    if order.status != OrderStatus::Pending {
        return Err(WorkflowError::StateConflict(format!(
            "Order {} cannot start from status {:?}",
            order.id, order.status
        )));
    }

    order.status = OrderStatus::InProgress;
    order.updated_at = now;
    Ok(())
}

pub fn complete(order: &mut Order, now: DateTime<Utc>) -> Result<(), WorkflowError> {
    if !order.status.is_live() {
        return Err(WorkflowError::StateConflict(format!(
            "Order {} cannot be completed from status {:?}",
            order.id, order.status
        )));
    }

    order.status = OrderStatus::Done;
    order.completed_at = Some(now);
    order.updated_at = now;
    Ok(())
}

/// Cancels a live order. A blank `reason` leaves the order untouched.
pub fn cancel(
    order: &mut Order,
    cancelled_by: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::InvalidArgument(
            "Cancellation reason is required".to_string(),
        ));
    }

    match order.status {
        OrderStatus::Cancelled => {
            return Err(WorkflowError::StateConflict(format!(
                "Order {} is already cancelled",
                order.id
            )));
        }
        OrderStatus::Done => {
            return Err(WorkflowError::StateConflict(format!(
                "Order {} is already done",
                order.id
            )));
        }
        OrderStatus::Pending | OrderStatus::InProgress => {}
    }

    order.status = OrderStatus::Cancelled;
    order.cancelled_at = Some(now);
    order.cancelled_by = Some(cancelled_by.to_string());
    order.cancellation_reason = Some(reason.to_string());
    order.updated_at = now;
    Ok(())
}

/// Visit status implied by the statuses of all its orders.
///
/// Any live order keeps the visit processing; otherwise a finished order
/// completes it, and a visit with only cancelled orders (or none) is back to
/// pending.
#[must_use]
pub fn visit_status_for<I>(orders: I) -> VisitStatus
where
    I: IntoIterator<Item = OrderStatus>,
{
    let mut any_done = false;
    for status in orders {
        match status {
            OrderStatus::Pending | OrderStatus::InProgress => return VisitStatus::Processing,
            OrderStatus::Done => any_done = true,
            OrderStatus::Cancelled => {}
        }
    }

    if any_done {
        VisitStatus::Completed
    } else {
        VisitStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 9, 0, 0).unwrap()
    }

    fn item(name: &str, price: i64, qty: i32) -> OrderItem {
        OrderItem {
            lab_group_id: Some(1),
            name: name.to_string(),
            price,
            qty,
        }
    }

    fn pending_order() -> Order {
        Order {
            id: 4,
            status: OrderStatus::Pending,
            ..Default::default()
        }
    }

    #[test]
    fn test_order_total() {
        let items = [item("CBC", 150, 1), item("Lipid profile", 400, 2)];
        assert_eq!(order_total(&items).unwrap(), 950);

        assert!(order_total(&[]).is_err());
        assert!(order_total(&[item("CBC", 150, 0)]).is_err());
        assert!(order_total(&[item("CBC", -1, 1)]).is_err());
        assert!(order_total(&[item("CBC", i64::MAX, 2)]).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut order = pending_order();
        start(&mut order, now()).unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert!(start(&mut order, now()).is_err());

        complete(&mut order, now()).unwrap();
        assert_eq!(order.status, OrderStatus::Done);
        assert_eq!(order.completed_at, Some(now()));

        let err = cancel(&mut order, "tech01", "Wrong panel", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::StateConflict(_)));
    }

    #[test]
    fn test_cancel() {
        let mut order = pending_order();

        let err = cancel(&mut order, "tech01", "  ", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));
        assert_eq!(order.status, OrderStatus::Pending);

        cancel(&mut order, "tech01", " Duplicate order ", now()).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancelled_by.as_deref(), Some("tech01"));
        assert_eq!(order.cancellation_reason.as_deref(), Some("Duplicate order"));
        assert_eq!(order.cancelled_at, Some(now()));

        let err = cancel(&mut order, "tech01", "Again", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::StateConflict(_)));
    }

    #[test]
    fn test_visit_status_for() {
        use OrderStatus::{Cancelled, Done, InProgress, Pending};

        assert_eq!(visit_status_for(Vec::<OrderStatus>::new()), VisitStatus::Pending);
        assert_eq!(visit_status_for([Cancelled]), VisitStatus::Pending);
        assert_eq!(visit_status_for([Done, Pending]), VisitStatus::Processing);
        assert_eq!(visit_status_for([InProgress, Cancelled]), VisitStatus::Processing);
        assert_eq!(visit_status_for([Done, Cancelled]), VisitStatus::Completed);
    }
}
