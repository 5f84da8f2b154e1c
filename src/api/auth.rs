use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::error::SubscriptionDenial;
use super::validation::{validate_id, validate_required};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::pricing::{self, PlanPrices};
use crate::domain::subscription::{self, AccessDenial, AccessFacts, ExpiryWarning};
use crate::models::{Account, Payment, PaymentMethod, Plan, Role, SubscriptionStatus};
use crate::services::{AuthError, CreatePaymentRequest, RegisterRequest};

const SESSION_ACCOUNT_KEY: &str = "account_id";

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_string()),
            AuthError::Locked { minutes } => Self::Locked { minutes },
            AuthError::AccountNotFound => Self::NotFound("Account not found".to_string()),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// The authenticated caller, attached to the request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub plan: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub account: Account,
    pub payment: Payment,
    pub api_key: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub account: Account,
    pub api_key: String,
    pub access: AccessFacts,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub account: Account,
    pub access: AccessFacts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_warning: Option<ExpiryWarning>,
}

#[derive(Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan: Plan,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub days_remaining: i64,
    pub can_access: bool,
    pub is_expiring_soon: bool,
}

#[derive(Deserialize)]
pub struct CreatePaymentBody {
    pub plan: String,
    pub months: u32,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ConfirmPaymentBody {
    pub transaction_id: Option<String>,
    pub gateway_response: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
///
/// The resolved account is stored as a [`CurrentAccount`] request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut account = None;

    if let Ok(Some(account_id)) = session.get::<i32>(SESSION_ACCOUNT_KEY).await {
        match state.auth_service().get_account(account_id).await {
            Ok(found) => account = Some(found),
            Err(AuthError::AccountNotFound) => {
                let _ = session.flush().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if account.is_none()
        && let Some(key) = extract_api_key(&headers)
    {
        account = state.auth_service().authenticate_api_key(&key).await?;
    }

    let Some(account) = account else {
        return Err(ApiError::Unauthorized("Authentication required".to_string()));
    };

    tracing::Span::current().record("account_id", account.id);
    request.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(request).await)
}

/// Extract API key from headers
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// Admin routes: the caller must be an enabled account holding the `admin` role.
pub async fn require_admin(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !account.is_active {
        return Err(ApiError::forbidden(AccessDenial::AccountDisabled.message()));
    }
    if !account.is_admin() {
        return Err(ApiError::forbidden("Administrator access required"));
    }
    Ok(next.run(request).await)
}

/// Clinical routes: enabled admins pass, everyone else needs a live subscription.
pub async fn require_active_subscription(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let denial = if account.is_admin() {
        (!account.is_active).then_some(AccessDenial::AccountDisabled)
    } else {
        subscription::access_denial(&account, now)
    };

    if let Some(reason) = denial {
        tracing::debug!(account_id = account.id, ?reason, "Subscription gate denied request");
        return Err(ApiError::SubscriptionRequired(SubscriptionDenial {
            reason,
            subscription_status: account.subscription_status,
            subscription_end_date: account.subscription_end_date,
            days_remaining: subscription::days_remaining(&account, now),
        }));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an account awaiting approval together with its registration payment
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = state
        .auth_service()
        .register(RegisterRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            role: payload.role,
            plan: payload.plan,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterResponse {
            account: registration.account,
            payment: registration.payment,
            api_key: registration.api_key,
            message: "Registration received, awaiting administrator approval".to_string(),
        })),
    ))
}

/// POST /auth/login
/// Authenticate with email and password, returns API key on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let email = validate_required("Email", &payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state.auth_service().login(email, &payload.password).await?;

    if let Err(e) = session.insert(SESSION_ACCOUNT_KEY, result.account.id).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    Ok(Json(ApiResponse::success(LoginResponse {
        account: result.account,
        api_key: result.api_key,
        access: result.access,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/plans
pub async fn get_plans() -> Json<ApiResponse<BTreeMap<&'static str, PlanPrices>>> {
    Json(ApiResponse::success(pricing::price_table()))
}

/// GET /auth/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<ApiResponse<ProfileResponse>> {
    let threshold = state.config().read().await.subscription.expiring_threshold_days;
    let now = Utc::now();

    Json(ApiResponse::success(ProfileResponse {
        access: subscription::compute_access_facts(&account, now),
        expiry_warning: subscription::expiry_warning(&account, now, threshold),
        account,
    }))
}

/// GET /auth/subscription-status
pub async fn get_subscription_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<ApiResponse<SubscriptionStatusResponse>> {
    let threshold = state.config().read().await.subscription.expiring_threshold_days;
    let now = Utc::now();
    let facts = subscription::compute_access_facts(&account, now);

    Json(ApiResponse::success(SubscriptionStatusResponse {
        subscription_status: account.subscription_status,
        subscription_plan: account.subscription_plan,
        subscription_start_date: account.subscription_start_date,
        subscription_end_date: account.subscription_end_date,
        is_expired: facts.is_expired,
        days_remaining: facts.days_remaining,
        can_access: facts.can_access,
        is_expiring_soon: subscription::is_expiring_soon(&account, now, threshold),
    }))
}

/// POST /auth/create-payment
/// Create a priced payment for a new or renewed subscription
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<CreatePaymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state
        .membership_service()
        .create_payment(
            account.id,
            CreatePaymentRequest {
                plan: payload.plan,
                months: payload.months,
                payment_method: payload.payment_method,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(payment))))
}

/// POST /auth/confirm-payment/{payment_id}
/// Gateway callback on behalf of the payment's owner
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(payment_id): Path<i32>,
    Json(payload): Json<ConfirmPaymentBody>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    let payment_id = validate_id("Payment", payment_id)?;

    let mut details = payload.gateway_response;
    if let Some(transaction_id) = payload.transaction_id {
        details.insert(
            "transaction_id".to_string(),
            serde_json::Value::String(transaction_id),
        );
    }

    let decision = state
        .membership_service()
        .mark_payment_completed(
            payment_id,
            Some(account.id),
            serde_json::Value::Object(details),
        )
        .await?;

    Ok(Json(ApiResponse::success(decision.payment)))
}

/// GET /auth/payments
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, ApiError> {
    let payments = state
        .membership_service()
        .list_account_payments(account.id)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}

/// PUT /auth/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(account.id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// POST /auth/api-key/regenerate
/// Generate a new random API key
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state.auth_service().regenerate_api_key(account.id).await?;
    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}
