//! Administration API endpoints.
//!
//! Every handler here sits behind the admin role gate. Business rules live in
//! [`MembershipService`](crate::services::MembershipService) and
//! [`AccountService`](crate::services::AccountService).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::auth::CurrentAccount;
use super::validation::{validate_days, validate_id, validate_pagination};
use super::types::{default_limit, default_page};
use super::{ApiError, ApiResponse, AppState, MessageResponse, PaginatedDto};
use crate::db::repositories::{AccountFilter, PaymentFilter};
use crate::models::{Account, Payment, PaymentMethod, PaymentStatus, Plan, Role, SubscriptionStatus};
use crate::services::{
    AccountDetail, AccountError, AccountUpdate, ApprovalOptions, DashboardStats,
    MembershipDecision, MembershipError, PaymentInfoUpdate, PendingApprovals, RevenueBucket,
    RevenuePeriod, SubscriptionUpdate,
};

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::AccountNotFound(id) => Self::not_found("Account", id),
            MembershipError::PaymentNotFound(id) => Self::not_found("Payment", id),
            MembershipError::NoPendingPayment(id) => {
                Self::NotFound(format!("No pending payment found for account {id}"))
            }
            MembershipError::NotOwner(_) => {
                Self::forbidden("Payment belongs to another account")
            }
            MembershipError::Validation(msg) => Self::validation(msg),
            MembershipError::StateConflict(msg) => Self::Conflict(msg),
            MembershipError::Database(msg) => Self::DatabaseError(msg),
            MembershipError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(id) => Self::not_found("Account", id),
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::Validation(msg) => Self::validation(msg),
            AccountError::Database(msg) => Self::DatabaseError(msg),
            AccountError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<SubscriptionStatus>,
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<PaymentStatus>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    RevenuePeriod::default().to_string()
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateAccountBody {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateSubscriptionBody {
    pub status: Option<SubscriptionStatus>,
    pub plan: Option<Plan>,
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ApproveBody {
    pub end_date: Option<DateTime<Utc>>,
    pub months: Option<u32>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RejectBody {
    pub reason: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FailPaymentBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PaymentInfoBody {
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub payment_proof: Option<String>,
    pub notes: Option<String>,
}

/// `GET /api/admin/dashboard-stats`
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state.account_service().dashboard_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Lists accounts, newest first.
///
/// # Endpoint
/// `GET /api/admin/users`
///
/// # Query Parameters
/// - `page`, `limit`: pagination (defaults 1 and 20)
/// - `status`, `role`: exact filters
/// - `search`: substring of username, email or full name
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<ApiResponse<PaginatedDto<Account>>>, ApiError> {
    let (page, limit) = validate_pagination(query.page, query.limit)?;
    let filter = AccountFilter {
        status: query.status,
        role: query.role,
        search: query.search,
    };

    let accounts = state
        .account_service()
        .list_accounts(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(accounts.into())))
}

/// `GET /api/admin/users/{id}`
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountDetail>>, ApiError> {
    let id = validate_id("Account", id)?;
    let detail = state.account_service().get_account_detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// `PUT /api/admin/users/{id}`
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateAccountBody>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let id = validate_id("Account", id)?;
    let account = state
        .account_service()
        .update_account(
            id,
            AccountUpdate {
                full_name: body.full_name,
                email: body.email,
                role: body.role,
                is_active: body.is_active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(account)))
}

/// `PUT /api/admin/users/{id}/subscription`
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateSubscriptionBody>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let id = validate_id("Account", id)?;
    let account = state
        .account_service()
        .update_subscription(
            id,
            SubscriptionUpdate {
                status: body.status,
                plan: body.plan,
                months: body.months,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(account)))
}

/// Deletes an account with all of its payments.
///
/// # Endpoint
/// `DELETE /api/admin/users/{id}`
///
/// # Errors
/// Admins cannot delete their own account (400).
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id("Account", id)?;
    if id == admin.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    state.account_service().delete_account(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account and its payments deleted",
    ))))
}

/// `GET /api/admin/users/expiring/{days}`
pub async fn expiring_accounts(
    State(state): State<Arc<AppState>>,
    Path(days): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Account>>>, ApiError> {
    let days = validate_days(days)?;
    let accounts = state.account_service().expiring_accounts(days).await?;
    Ok(Json(ApiResponse::success(accounts)))
}

/// `GET /api/admin/payments`
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<ApiResponse<PaginatedDto<Payment>>>, ApiError> {
    let (page, limit) = validate_pagination(query.page, query.limit)?;
    let filter = PaymentFilter {
        status: query.status,
        plan: query.plan,
    };

    let payments = state
        .account_service()
        .list_payments(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(payments.into())))
}

/// Marks a payment as completed on the admin's authority and extends the
/// owner's subscription.
///
/// # Endpoint
/// `PUT /api/admin/payments/{id}/confirm`
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MembershipDecision>>, ApiError> {
    let id = validate_id("Payment", id)?;
    let details = json!({
        "admin_confirmed": true,
        "confirmed_by": admin.id,
        "confirmed_at": Utc::now(),
    });

    let decision = state
        .membership_service()
        .mark_payment_completed(id, None, details)
        .await?;
    Ok(Json(ApiResponse::success(decision)))
}

/// `PUT /api/admin/payments/{id}/fail`
pub async fn fail_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(body): Json<FailPaymentBody>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let id = validate_id("Payment", id)?;
    let payment = state
        .membership_service()
        .mark_payment_failed(id, body.reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// Completed payments grouped by period, most recent twelve buckets.
///
/// # Endpoint
/// `GET /api/admin/reports/revenue?period=daily|weekly|monthly|yearly`
pub async fn revenue_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<ApiResponse<Vec<RevenueBucket>>>, ApiError> {
    let period: RevenuePeriod = query.period.parse()?;
    let report = state.account_service().revenue_report(period).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// `GET /api/admin/pending-approvals`
pub async fn pending_approvals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PendingApprovals>>, ApiError> {
    let pending = state.membership_service().pending_approvals().await?;
    Ok(Json(ApiResponse::success(pending)))
}

/// Approves an account's pending registration payment.
///
/// # Endpoint
/// `PUT /api/admin/approve-membership/{user_id}`
///
/// # Body
/// Optional `end_date`, `months` and `plan`. An explicit end date wins over
/// `months`; without either the payment's duration applies.
///
/// # Errors
/// 404 when no payment awaits approval, which includes a repeated approval.
pub async fn approve_membership(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(user_id): Path<i32>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<ApiResponse<MembershipDecision>>, ApiError> {
    let user_id = validate_id("Account", user_id)?;
    let decision = state
        .membership_service()
        .approve_membership(
            user_id,
            admin.id,
            ApprovalOptions {
                end_date: body.end_date,
                months: body.months,
                plan: body.plan,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(decision)))
}

/// `PUT /api/admin/reject-membership/{user_id}`
pub async fn reject_membership(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(admin)): Extension<CurrentAccount>,
    Path(user_id): Path<i32>,
    Json(body): Json<RejectBody>,
) -> Result<Json<ApiResponse<MembershipDecision>>, ApiError> {
    let user_id = validate_id("Account", user_id)?;
    let decision = state
        .membership_service()
        .reject_membership(user_id, admin.id, &body.reason)
        .await?;
    Ok(Json(ApiResponse::success(decision)))
}

/// `PUT /api/admin/update-payment-info/{payment_id}`
pub async fn update_payment_info(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<i32>,
    Json(body): Json<PaymentInfoBody>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let payment_id = validate_id("Payment", payment_id)?;
    let payment = state
        .membership_service()
        .update_payment_info(
            payment_id,
            PaymentInfoUpdate {
                payment_method: body.payment_method,
                payment_reference: body.payment_reference,
                payment_proof: body.payment_proof,
                notes: body.notes,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}
