//! Domain service for registration, login and credentials.
//!
//! Handles account registration (with its pending payment), login with
//! attempt lockout, API key authentication and password changes.

use serde::Serialize;
use thiserror::Error;

use crate::domain::subscription::AccessFacts;
use crate::models::{Account, Payment, Role};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is locked, try again in {minutes} minutes")]
    Locked { minutes: i64 },

    #[error("Account not found")]
    AccountNotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub plan: Option<String>,
}

/// A new account together with the payment it must settle.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub account: Account,
    pub payment: Payment,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub account: Account,
    pub api_key: String,
    pub access: AccessFacts,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account awaiting approval and its registration payment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the username or email is taken and
    /// [`AuthError::Validation`] for malformed input.
    async fn register(&self, request: RegisterRequest) -> Result<Registration, AuthError>;

    /// Verifies email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Locked`] while the account is locked, without
    /// checking the password, and [`AuthError::InvalidCredentials`] otherwise
    /// on failure.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Resolves an API key to its account.
    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<Account>, AuthError>;

    async fn get_account(&self, account_id: i32) -> Result<Account, AuthError>;

    /// Changes an account's password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is wrong or
    /// the new one is too short or unchanged.
    async fn change_password(
        &self,
        account_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Regenerates the API key for an account and returns the new one.
    async fn regenerate_api_key(&self, account_id: i32) -> Result<String, AuthError>;

    /// Creates an active administrator, or promotes the existing account
    /// with that username or email.
    async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Account, AuthError>;
}
