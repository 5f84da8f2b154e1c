use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

mod admin;
pub mod auth;
mod error;
mod lab;
mod observability;
mod orders;
mod patients;
mod types;
mod validation;
mod visits;

pub use error::{ApiError, SubscriptionDenial};
pub use types::*;

use crate::services::{
    AccountService, AuthService, LabService, MembershipService, OrderService, RegistryService,
};

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn membership_service(&self) -> &Arc<dyn MembershipService> {
        &self.shared.membership_service
    }

    #[must_use]
    pub fn account_service(&self) -> &Arc<dyn AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn registry_service(&self) -> &Arc<dyn RegistryService> {
        &self.shared.registry_service
    }

    #[must_use]
    pub fn lab_service(&self) -> &Arc<dyn LabService> {
        &self.shared.lab_service
    }

    #[must_use]
    pub fn order_service(&self) -> &Arc<dyn OrderService> {
        &self.shared.order_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_account_router(state.clone()))
        .merge(create_admin_router(state.clone()))
        .merge(create_clinical_router(state.clone()))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(observability::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/plans", get(auth::get_plans))
}

/// Any authenticated caller, whatever their subscription state.
fn create_account_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/profile", get(auth::get_profile))
        .route(
            "/auth/subscription-status",
            get(auth::get_subscription_status),
        )
        .route("/auth/create-payment", post(auth::create_payment))
        .route(
            "/auth/confirm-payment/{payment_id}",
            post(auth::confirm_payment),
        )
        .route("/auth/payments", get(auth::list_payments))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/api-key/regenerate", post(auth::regenerate_api_key))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/dashboard-stats", get(admin::dashboard_stats))
        .route("/admin/users", get(admin::list_accounts))
        .route(
            "/admin/users/{id}",
            get(admin::get_account)
                .put(admin::update_account)
                .delete(admin::delete_account),
        )
        .route(
            "/admin/users/{id}/subscription",
            put(admin::update_subscription),
        )
        .route(
            "/admin/users/expiring/{days}",
            get(admin::expiring_accounts),
        )
        .route("/admin/payments", get(admin::list_payments))
        .route("/admin/payments/{id}/confirm", put(admin::confirm_payment))
        .route("/admin/payments/{id}/fail", put(admin::fail_payment))
        .route("/admin/reports/revenue", get(admin::revenue_report))
        .route("/admin/pending-approvals", get(admin::pending_approvals))
        .route(
            "/admin/approve-membership/{user_id}",
            put(admin::approve_membership),
        )
        .route(
            "/admin/reject-membership/{user_id}",
            put(admin::reject_membership),
        )
        .route(
            "/admin/update-payment-info/{payment_id}",
            put(admin::update_payment_info),
        )
        .route("/metrics", get(observability::get_metrics))
        // Layers run bottom-up: authenticate first, then check the role.
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

fn create_clinical_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route("/patients/search", get(patients::find_by_id_card))
        .route("/patients/next-ln", get(patients::next_ln))
        .route("/patients/last-ln", get(patients::last_ln))
        .route(
            "/patients/{id}",
            get(patients::get_patient).put(patients::update_patient),
        )
        .route(
            "/visits",
            get(visits::list_visits).post(visits::create_visit),
        )
        .route("/visits/next-reference", get(visits::next_reference))
        .route("/visits/last-reference", get(visits::last_reference))
        .route("/visits/organizations", get(visits::organizations))
        .route("/visits/{reference_number}", get(visits::get_visit))
        .route(
            "/visits/id/{id}",
            put(visits::update_visit).delete(visits::delete_visit),
        )
        .route("/lab-items", get(lab::list_tests).post(lab::create_test))
        .route(
            "/lab-items/{id}",
            put(lab::update_test).delete(lab::delete_test),
        )
        .route("/lab-groups", get(lab::list_groups).post(lab::create_group))
        .route(
            "/lab-groups/{id}",
            get(lab::get_group)
                .put(lab::update_group)
                .delete(lab::delete_group),
        )
        .route(
            "/lab-results",
            get(lab::list_results).post(lab::record_result),
        )
        .route(
            "/lab-results/visit/{visit_id}",
            get(lab::results_for_visit),
        )
        .route("/lab-results/{id}", put(lab::update_result))
        .route(
            "/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/start", put(orders::start_order))
        .route("/orders/{id}/complete", put(orders::complete_order))
        .route("/orders/{id}/cancel", put(orders::cancel_order))
        .route_layer(middleware::from_fn(auth::require_active_subscription))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
