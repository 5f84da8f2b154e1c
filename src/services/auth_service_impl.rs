//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::config::{SecurityConfig, SubscriptionConfig};
use crate::db::repositories::user::{
    generate_api_key, hash_password_blocking, verify_password,
};
use crate::db::repositories::{NewAccount, NewPayment, PaymentRepository, UserRepository};
use crate::db::{Store, is_unique_violation_error};
use crate::domain::{pricing, subscription};
use crate::models::{
    Account, ApprovalStatus, PaymentMethod, PaymentStatus, Plan, Role, SubscriptionStatus,
};
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, RegisterRequest, Registration,
};
use crate::services::validation;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    subscription: SubscriptionConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        security: SecurityConfig,
        subscription: SubscriptionConfig,
    ) -> Self {
        Self {
            store,
            security,
            subscription,
        }
    }

    fn duplicate_or_internal(err: anyhow::Error) -> AuthError {
        if is_unique_violation_error(&err) {
            AuthError::Conflict("User with this email or username already exists".to_string())
        } else {
            AuthError::Internal(err.to_string())
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<Registration, AuthError> {
        let username = validation::username(&request.username).map_err(AuthError::Validation)?;
        let email = validation::email(&request.email).map_err(AuthError::Validation)?;
        validation::password(&request.password).map_err(AuthError::Validation)?;
        let full_name =
            validation::required("Full name", &request.full_name).map_err(AuthError::Validation)?;

        let role = request.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AuthError::Validation(
                "Administrator accounts cannot be self-registered".to_string(),
            ));
        }

        let plan = match request.plan.as_deref() {
            Some(name) => pricing::parse_plan(name),
            None => Ok(Plan::default()),
        }
        .map_err(|e| AuthError::Validation(e.to_string()))?;

        let months = self.subscription.registration_duration_months;
        let amount = pricing::price(plan, months).map_err(|e| AuthError::Validation(e.to_string()))?;
        let duration = i32::try_from(months).map_err(|e| AuthError::Internal(e.to_string()))?;

        if self.store.users().is_taken(&username, &email, None).await? {
            return Err(AuthError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let password_hash = hash_password_blocking(&request.password, &self.security).await?;
        let api_key = generate_api_key();
        let now = Utc::now();

        let txn = self.store.begin().await?;

        let user = UserRepository::new(&txn)
            .insert(
                NewAccount {
                    username,
                    email,
                    password_hash,
                    api_key: api_key.clone(),
                    full_name,
                    role,
                    subscription_plan: plan,
                    subscription_status: SubscriptionStatus::PendingApproval,
                    approval_status: ApprovalStatus::Pending,
                },
                now,
            )
            .await
            .map_err(Self::duplicate_or_internal)?;

        let payment = PaymentRepository::new(&txn)
            .insert(
                NewPayment {
                    account_id: user.id,
                    amount,
                    currency: self.subscription.currency,
                    payment_method: PaymentMethod::BankTransfer,
                    payment_status: PaymentStatus::PendingApproval,
                    approval_status: ApprovalStatus::Pending,
                    subscription_plan: plan,
                    subscription_duration: duration,
                    due_date: now + Duration::days(self.subscription.payment_due_days),
                    payment_reference: None,
                    payment_proof: None,
                    notes: None,
                },
                now,
            )
            .await?;

        txn.commit().await?;

        info!(
            account_id = user.id,
            payment_id = payment.id,
            plan = %plan,
            amount,
            "Account registered, awaiting approval"
        );

        Ok(Registration {
            account: user.into(),
            payment: payment.into(),
            api_key,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some(user) = self.store.users().get_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        let policy = self.security.lockout.policy();

        if let Some(minutes) = policy.remaining_minutes(user.lock_until, now) {
            warn!(account_id = user.id, minutes, "Login attempt on locked account");
            return Err(AuthError::Locked { minutes });
        }

        if !verify_password(password, &user.password_hash).await? {
            let outcome = policy.record_failure(user.login_attempts, now);
            self.store
                .users()
                .record_login_failure(user.id, outcome.attempts, outcome.lock_until)
                .await?;

            if outcome.lock_until.is_some() {
                warn!(
                    account_id = user.id,
                    attempts = outcome.attempts,
                    "Account locked after repeated login failures"
                );
            }
            return Err(AuthError::InvalidCredentials);
        }

        self.store.users().reset_login_attempts(user.id).await?;

        let api_key = user.api_key.clone();
        let mut account = Account::from(user);
        account.login_attempts = 0;
        account.lock_until = None;

        info!(account_id = account.id, "Login successful");

        Ok(LoginResult {
            access: subscription::compute_access_facts(&account, now),
            account,
            api_key,
        })
    }

    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<Account>, AuthError> {
        let user = self.store.users().get_by_api_key(api_key).await?;
        Ok(user.map(Account::from))
    }

    async fn get_account(&self, account_id: i32) -> Result<Account, AuthError> {
        self.store
            .users()
            .get_by_id(account_id)
            .await?
            .map(Account::from)
            .ok_or(AuthError::AccountNotFound)
    }

    async fn change_password(
        &self,
        account_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validation::password(new_password).map_err(AuthError::Validation)?;

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .store
            .users()
            .get_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !verify_password(current_password, &user.password_hash).await? {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash = hash_password_blocking(new_password, &self.security).await?;
        self.store
            .users()
            .update_password_hash(account_id, new_hash)
            .await?;

        info!(account_id, "Password changed");
        Ok(())
    }

    async fn regenerate_api_key(&self, account_id: i32) -> Result<String, AuthError> {
        if self.store.users().get_by_id(account_id).await?.is_none() {
            return Err(AuthError::AccountNotFound);
        }

        let api_key = generate_api_key();
        self.store
            .users()
            .update_api_key(account_id, api_key.clone())
            .await?;

        info!(account_id, "API key regenerated");
        Ok(api_key)
    }

    async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Account, AuthError> {
        let username = validation::username(username).map_err(AuthError::Validation)?;
        let email = validation::email(email).map_err(AuthError::Validation)?;
        validation::password(password).map_err(AuthError::Validation)?;
        let full_name =
            validation::required("Full name", full_name).map_err(AuthError::Validation)?;

        let password_hash = hash_password_blocking(password, &self.security).await?;
        let now = Utc::now();
        let users = self.store.users();

        let existing = match users.get_by_username(&username).await? {
            Some(user) => Some(user),
            None => users.get_by_email(&email).await?,
        };

        if let Some(user) = existing {
            let mut account = Account::from(user);
            account.role = Role::Admin;
            account.is_active = true;
            account.subscription_status = SubscriptionStatus::Active;
            account.approval_status = ApprovalStatus::Approved;
            account.approved_at = Some(now);
            account.updated_at = now;

            users.save(&account).await?;
            users.update_password_hash(account.id, password_hash).await?;

            info!(account_id = account.id, "Existing account promoted to admin");
            return Ok(account);
        }

        let user = users
            .insert(
                NewAccount {
                    username,
                    email,
                    password_hash,
                    api_key: generate_api_key(),
                    full_name,
                    role: Role::Admin,
                    subscription_plan: Plan::Enterprise,
                    subscription_status: SubscriptionStatus::Active,
                    approval_status: ApprovalStatus::Approved,
                },
                now,
            )
            .await
            .map_err(Self::duplicate_or_internal)?;

        info!(account_id = user.id, "Admin account created");
        Ok(user.into())
    }
}
