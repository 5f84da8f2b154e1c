//! Membership approval state machine.
//!
//! Transitions operate on in-memory snapshots of an account and one of its
//! payments. Callers persist both snapshots together; nothing here touches
//! storage.

use chrono::{DateTime, Months, Utc};
use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;

use crate::entities::enums::{ApprovalStatus, PaymentStatus, Plan, SubscriptionStatus};
use crate::models::{Account, Payment};

const TRANSACTION_SUFFIX_LEN: usize = 9;
const RECEIPT_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    StateConflict(String),
}

fn require_pending_approval(payment: &Payment) -> Result<(), WorkflowError> {
    if payment.is_pending_approval() {
        Ok(())
    } else {
        Err(WorkflowError::StateConflict(format!(
            "Payment {} is not awaiting approval (status: {:?}, approval: {:?})",
            payment.id, payment.payment_status, payment.approval_status
        )))
    }
}

fn require_open(payment: &Payment) -> Result<(), WorkflowError> {
    if payment.payment_status.is_terminal() {
        Err(WorkflowError::StateConflict(format!(
            "Payment {} is already {:?}",
            payment.id, payment.payment_status
        )))
    } else {
        Ok(())
    }
}

/// `date` moved forward by `months` calendar months, clamped to the last day
/// of the target month.
pub fn add_months(date: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, WorkflowError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| WorkflowError::InvalidArgument(format!("Cannot add {months} months to {date}")))
}

fn duration_months(payment: &Payment) -> Result<u32, WorkflowError> {
    u32::try_from(payment.subscription_duration)
        .ok()
        .filter(|months| *months > 0)
        .ok_or_else(|| {
            WorkflowError::InvalidArgument(format!(
                "Payment {} has invalid duration {}",
                payment.id, payment.subscription_duration
            ))
        })
}

/// Approves the registration payment and activates the account.
///
/// Without `end_override` the subscription runs for the payment's duration
/// starting at `now`.
pub fn approve(
    account: &mut Account,
    payment: &mut Payment,
    admin_id: i32,
    end_override: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    require_pending_approval(payment)?;

    let end_date = match end_override {
        Some(end_date) => end_date,
        None => add_months(now, duration_months(payment)?)?,
    };

    payment.approval_status = ApprovalStatus::Approved;
    payment.payment_status = PaymentStatus::Completed;
    payment.approved_by = Some(admin_id);
    payment.approved_at = Some(now);
    payment.payment_date = Some(now);
    payment.updated_at = now;
    assign_completion_identifiers(payment, now);

    account.approval_status = ApprovalStatus::Approved;
    account.subscription_status = SubscriptionStatus::Active;
    account.subscription_plan = payment.subscription_plan;
    account.subscription_start_date = Some(now);
    account.subscription_end_date = Some(end_date);
    account.approved_by = Some(admin_id);
    account.approved_at = Some(now);
    account.rejection_reason = None;
    account.total_paid += payment.amount;
    account.last_payment_date = Some(now);
    account.updated_at = now;

    Ok(())
}

/// Rejects the registration payment. The account's subscription fields are
/// left as they were.
pub fn reject(
    account: &mut Account,
    payment: &mut Payment,
    admin_id: i32,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::InvalidArgument(
            "Rejection reason is required".to_string(),
        ));
    }
    require_pending_approval(payment)?;

    payment.approval_status = ApprovalStatus::Rejected;
    payment.payment_status = PaymentStatus::Failed;
    payment.rejection_reason = Some(reason.to_string());
    payment.approved_by = Some(admin_id);
    payment.approved_at = Some(now);
    payment.updated_at = now;

    account.approval_status = ApprovalStatus::Rejected;
    account.rejection_reason = Some(reason.to_string());
    account.approved_by = Some(admin_id);
    account.approved_at = Some(now);
    account.updated_at = now;

    Ok(())
}

/// Settles a payment and extends the owner's subscription by its duration.
///
/// `details` is merged into the stored gateway response; keys in `details`
/// win over existing ones. A `transaction_id` string in `details` becomes the
/// payment's transaction id unless one is already set.
pub fn mark_completed(
    account: &mut Account,
    payment: &mut Payment,
    details: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    require_open(payment)?;
    let months = duration_months(payment)?;

    if payment.transaction_id.is_none() {
        payment.transaction_id = details
            .get("transaction_id")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    payment.payment_status = PaymentStatus::Completed;
    payment.payment_date = Some(now);
    payment.gateway_response = merge_gateway_response(
        std::mem::take(&mut payment.gateway_response),
        details,
    );
    payment.updated_at = now;
    assign_completion_identifiers(payment, now);

    extend_subscription(account, months, Some(payment.subscription_plan), now)?;
    account.total_paid += payment.amount;

    Ok(())
}

pub fn mark_failed(
    payment: &mut Payment,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    require_open(payment)?;

    payment.payment_status = PaymentStatus::Failed;
    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        payment.notes = Some(reason.to_string());
    }
    payment.updated_at = now;

    Ok(())
}

/// Adds `months` to the account's subscription.
///
/// A live subscription is extended from its current end date; an absent or
/// expired one restarts at `now`.
pub fn extend_subscription(
    account: &mut Account,
    months: u32,
    plan: Option<Plan>,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if months == 0 {
        return Err(WorkflowError::InvalidArgument(
            "Extension must be at least one month".to_string(),
        ));
    }

    match account.subscription_end_date {
        Some(end_date) if end_date >= now => {
            account.subscription_end_date = Some(add_months(end_date, months)?);
        }
        _ => {
            account.subscription_start_date = Some(now);
            account.subscription_end_date = Some(add_months(now, months)?);
        }
    }

    account.subscription_status = SubscriptionStatus::Active;
    if let Some(plan) = plan {
        account.subscription_plan = plan;
    }
    account.last_payment_date = Some(now);
    account.updated_at = now;

    Ok(())
}

/// Fills in the transaction id and receipt number if they are missing.
/// Existing identifiers are never replaced.
pub fn assign_completion_identifiers(payment: &mut Payment, now: DateTime<Utc>) {
    if payment.transaction_id.is_none() {
        payment.transaction_id = Some(format!(
            "TXN_{}_{}",
            now.timestamp_millis(),
            random_alphanumeric(TRANSACTION_SUFFIX_LEN).to_ascii_lowercase()
        ));
    }

    if payment.receipt_number.is_none() {
        payment.receipt_number = Some(format!(
            "RCP{}{}",
            now.format("%Y%m%d"),
            random_alphanumeric(RECEIPT_SUFFIX_LEN).to_ascii_uppercase()
        ));
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn merge_gateway_response(
    existing: serde_json::Value,
    details: serde_json::Value,
) -> serde_json::Value {
    match (existing, details) {
        (serde_json::Value::Object(mut base), serde_json::Value::Object(extra)) => {
            base.extend(extra);
            serde_json::Value::Object(base)
        }
        (existing, serde_json::Value::Null) => existing,
        (_, details) => details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 8, 30, 0).unwrap()
    }

    fn registered() -> (Account, Payment) {
        let account = Account {
            id: 7,
            is_active: true,
            ..Default::default()
        };
        let payment = Payment {
            id: 11,
            account_id: 7,
            amount: 799,
            subscription_plan: Plan::Premium,
            subscription_duration: 3,
            gateway_response: json!({}),
            ..Default::default()
        };
        (account, payment)
    }

    #[test]
    fn test_approve_activates_account() {
        let (mut account, mut payment) = registered();
        approve(&mut account, &mut payment, 1, None, now()).unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Completed);
        assert_eq!(payment.approval_status, ApprovalStatus::Approved);
        assert_eq!(payment.approved_by, Some(1));
        assert_eq!(payment.payment_date, Some(now()));

        assert_eq!(account.subscription_status, SubscriptionStatus::Active);
        assert_eq!(account.approval_status, ApprovalStatus::Approved);
        assert_eq!(account.subscription_plan, Plan::Premium);
        assert_eq!(account.subscription_start_date, Some(now()));
        assert_eq!(
            account.subscription_end_date,
            Some(Utc.with_ymd_and_hms(2025, 12, 10, 8, 30, 0).unwrap())
        );
        assert_eq!(account.total_paid, 799);
        assert_eq!(account.last_payment_date, Some(now()));
    }

    #[test]
    fn test_approve_with_end_override() {
        let (mut account, mut payment) = registered();
        let end = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        approve(&mut account, &mut payment, 1, Some(end), now()).unwrap();

        assert_eq!(account.subscription_end_date, Some(end));
    }

    #[test]
    fn test_approve_assigns_identifiers() {
        let (mut account, mut payment) = registered();
        approve(&mut account, &mut payment, 1, None, now()).unwrap();

        let txn = payment.transaction_id.unwrap();
        let prefix = format!("TXN_{}_", now().timestamp_millis());
        assert!(txn.starts_with(&prefix));
        let suffix = &txn[prefix.len()..];
        assert_eq!(suffix.len(), 9);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );

        let receipt = payment.receipt_number.unwrap();
        assert!(receipt.starts_with("RCP20250910"));
        let suffix = &receipt["RCP20250910".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_second_approve_is_a_conflict() {
        let (mut account, mut payment) = registered();
        approve(&mut account, &mut payment, 1, None, now()).unwrap();

        let before = (account.clone(), payment.clone());
        let result = approve(&mut account, &mut payment, 1, None, now());
        assert!(matches!(result, Err(WorkflowError::StateConflict(_))));
        assert_eq!((account, payment), before);
    }

    #[test]
    fn test_reject_requires_reason() {
        let (mut account, mut payment) = registered();
        let before = (account.clone(), payment.clone());

        let result = reject(&mut account, &mut payment, 1, "   ", now());
        assert!(matches!(result, Err(WorkflowError::InvalidArgument(_))));
        assert_eq!((account, payment), before);
    }

    #[test]
    fn test_reject_leaves_subscription_alone() {
        let (mut account, mut payment) = registered();
        reject(&mut account, &mut payment, 1, "proof unreadable", now()).unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Failed);
        assert_eq!(payment.approval_status, ApprovalStatus::Rejected);
        assert_eq!(payment.rejection_reason.as_deref(), Some("proof unreadable"));
        assert!(payment.transaction_id.is_none());

        assert_eq!(account.approval_status, ApprovalStatus::Rejected);
        assert_eq!(account.rejection_reason.as_deref(), Some("proof unreadable"));
        assert_eq!(
            account.subscription_status,
            SubscriptionStatus::PendingApproval
        );
        assert!(account.subscription_end_date.is_none());
        assert_eq!(account.total_paid, 0);
    }

    #[test]
    fn test_reject_after_approve_is_a_conflict() {
        let (mut account, mut payment) = registered();
        approve(&mut account, &mut payment, 1, None, now()).unwrap();

        let result = reject(&mut account, &mut payment, 1, "late", now());
        assert!(matches!(result, Err(WorkflowError::StateConflict(_))));
    }

    #[test]
    fn test_identifiers_are_never_reassigned() {
        let (_, mut payment) = registered();
        assign_completion_identifiers(&mut payment, now());
        let first = (payment.transaction_id.clone(), payment.receipt_number.clone());

        assign_completion_identifiers(&mut payment, now() + chrono::Duration::days(2));
        assert_eq!(
            (payment.transaction_id.clone(), payment.receipt_number.clone()),
            first
        );
    }

    #[test]
    fn test_extend_stacks_on_live_subscription() {
        let end = Utc.with_ymd_and_hms(2025, 10, 15, 0, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 9, 15, 0, 0, 0).unwrap();
        let mut account = Account {
            subscription_status: SubscriptionStatus::Active,
            subscription_start_date: Some(start),
            subscription_end_date: Some(end),
            ..Default::default()
        };

        extend_subscription(&mut account, 3, None, now()).unwrap();

        assert_eq!(
            account.subscription_end_date,
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(account.subscription_start_date, Some(start));
    }

    #[test]
    fn test_extend_restarts_expired_subscription() {
        let mut account = Account {
            subscription_status: SubscriptionStatus::Expired,
            subscription_end_date: Some(now() - chrono::Duration::days(30)),
            ..Default::default()
        };

        extend_subscription(&mut account, 1, Some(Plan::Enterprise), now()).unwrap();

        assert_eq!(account.subscription_start_date, Some(now()));
        assert_eq!(
            account.subscription_end_date,
            Some(Utc.with_ymd_and_hms(2025, 10, 10, 8, 30, 0).unwrap())
        );
        assert_eq!(account.subscription_status, SubscriptionStatus::Active);
        assert_eq!(account.subscription_plan, Plan::Enterprise);
    }

    #[test]
    fn test_month_end_is_clamped() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            add_months(jan_31, 1).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_mark_completed_merges_gateway_response() {
        let (mut account, mut payment) = registered();
        payment.payment_status = PaymentStatus::Pending;
        payment.gateway_response = json!({"provider": "promptpay", "attempt": 1});

        mark_completed(
            &mut account,
            &mut payment,
            json!({"attempt": 2, "ref": "abc"}),
            now(),
        )
        .unwrap();

        assert_eq!(
            payment.gateway_response,
            json!({"provider": "promptpay", "attempt": 2, "ref": "abc"})
        );
        assert_eq!(payment.payment_status, PaymentStatus::Completed);
        assert!(payment.transaction_id.is_some());
        assert_eq!(account.total_paid, 799);
        assert_eq!(account.subscription_status, SubscriptionStatus::Active);
        assert_eq!(account.subscription_plan, Plan::Premium);
    }

    #[test]
    fn test_mark_completed_keeps_gateway_transaction_id() {
        let (mut account, mut payment) = registered();
        payment.payment_status = PaymentStatus::Pending;

        mark_completed(
            &mut account,
            &mut payment,
            json!({"transaction_id": "GW-778"}),
            now(),
        )
        .unwrap();

        assert_eq!(payment.transaction_id.as_deref(), Some("GW-778"));
        assert!(payment.receipt_number.as_deref().unwrap().starts_with("RCP20250910"));
    }

    #[test]
    fn test_terminal_payments_do_not_transition() {
        let (mut account, mut payment) = registered();
        payment.payment_status = PaymentStatus::Refunded;

        assert!(matches!(
            mark_completed(&mut account, &mut payment, json!({}), now()),
            Err(WorkflowError::StateConflict(_))
        ));
        assert!(matches!(
            mark_failed(&mut payment, Some("declined"), now()),
            Err(WorkflowError::StateConflict(_))
        ));
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let (_, mut payment) = registered();
        payment.payment_status = PaymentStatus::Pending;

        mark_failed(&mut payment, Some("card declined"), now()).unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Failed);
        assert_eq!(payment.notes.as_deref(), Some("card declined"));
    }
}
