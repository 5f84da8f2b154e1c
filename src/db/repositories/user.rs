use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tokio::task;

use super::Page;
use crate::config::SecurityConfig;
use crate::entities::enums::{ApprovalStatus, Plan, Role, SubscriptionStatus};
use crate::entities::users;
use crate::models::Account;

/// Row data for a new account. Password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub api_key: String,
    pub full_name: String,
    pub role: Role,
    pub subscription_plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub status: Option<SubscriptionStatus>,
    pub role: Option<Role>,
    /// Matched against username, email and full name.
    pub search: Option<String>,
}

pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query user by ID")
    }

    /// Email lookup is case-insensitive; emails are stored lower-cased.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_api_key(&self, api_key: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::ApiKey.eq(api_key))
            .one(self.conn)
            .await
            .context("Failed to query user by API key")
    }

    /// Whether another account already uses `username` or `email`.
    pub async fn is_taken(
        &self,
        username: &str,
        email: &str,
        except_id: Option<i32>,
    ) -> Result<bool> {
        let mut query = users::Entity::find().filter(
            Condition::any()
                .add(users::Column::Username.eq(username))
                .add(users::Column::Email.eq(email.trim().to_lowercase())),
        );
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        let count = query
            .count(self.conn)
            .await
            .context("Failed to check for duplicate account")?;

        Ok(count > 0)
    }

    pub async fn insert(&self, account: NewAccount, now: DateTime<Utc>) -> Result<users::Model> {
        let model = users::ActiveModel {
            username: Set(account.username),
            email: Set(account.email.trim().to_lowercase()),
            password_hash: Set(account.password_hash),
            api_key: Set(account.api_key),
            full_name: Set(account.full_name),
            role: Set(account.role),
            subscription_status: Set(account.subscription_status),
            subscription_plan: Set(account.subscription_plan),
            subscription_start_date: Set(None),
            subscription_end_date: Set(None),
            last_payment_date: Set(None),
            total_paid: Set(0),
            approval_status: Set(account.approval_status),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            is_active: Set(true),
            login_attempts: Set(0),
            lock_until: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(self.conn).await.context("Failed to insert user")
    }

    /// Writes every mutable field of `account` back to its row.
    pub async fn save(&self, account: &Account) -> Result<()> {
        let model = users::ActiveModel {
            id: Set(account.id),
            email: Set(account.email.clone()),
            full_name: Set(account.full_name.clone()),
            role: Set(account.role),
            subscription_status: Set(account.subscription_status),
            subscription_plan: Set(account.subscription_plan),
            subscription_start_date: Set(account.subscription_start_date),
            subscription_end_date: Set(account.subscription_end_date),
            last_payment_date: Set(account.last_payment_date),
            total_paid: Set(account.total_paid),
            approval_status: Set(account.approval_status),
            approved_by: Set(account.approved_by),
            approved_at: Set(account.approved_at),
            rejection_reason: Set(account.rejection_reason.clone()),
            is_active: Set(account.is_active),
            login_attempts: Set(account.login_attempts),
            lock_until: Set(account.lock_until),
            updated_at: Set(account.updated_at),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .with_context(|| format!("Failed to update user {}", account.id))?;

        Ok(())
    }

    pub async fn record_login_failure(
        &self,
        id: i32,
        attempts: i32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let model = users::ActiveModel {
            id: Set(id),
            login_attempts: Set(attempts),
            lock_until: Set(lock_until),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .context("Failed to record login failure")?;
        Ok(())
    }

    pub async fn reset_login_attempts(&self, id: i32) -> Result<()> {
        let model = users::ActiveModel {
            id: Set(id),
            login_attempts: Set(0),
            lock_until: Set(None),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .context("Failed to reset login attempts")?;
        Ok(())
    }

    pub async fn update_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        let model = users::ActiveModel {
            id: Set(id),
            password_hash: Set(password_hash),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    pub async fn update_api_key(&self, id: i32, api_key: String) -> Result<()> {
        let model = users::ActiveModel {
            id: Set(id),
            api_key: Set(api_key),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .update(self.conn)
            .await
            .context("Failed to update API key")?;
        Ok(())
    }

    pub async fn list(&self, filter: &AccountFilter, page: u64, limit: u64) -> Result<Page<users::Model>> {
        let mut query = users::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(users::Column::SubscriptionStatus.eq(status));
        }
        if let Some(role) = filter.role {
            query = query.filter(users::Column::Role.eq(role));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Username.contains(search))
                    .add(users::Column::Email.contains(search))
                    .add(users::Column::FullName.contains(search)),
            );
        }

        let paginator = query
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .paginate(self.conn, limit);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count users")?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to list users")?;

        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn count_by_status(&self, status: SubscriptionStatus) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::SubscriptionStatus.eq(status))
            .count(self.conn)
            .await
            .context("Failed to count users by status")
    }

    /// Active accounts whose subscription ends within `[from, until]`,
    /// soonest first.
    pub async fn expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<users::Model>> {
        users::Entity::find()
            .filter(users::Column::SubscriptionStatus.eq(SubscriptionStatus::Active))
            .filter(users::Column::SubscriptionEndDate.gte(from))
            .filter(users::Column::SubscriptionEndDate.lte(until))
            .order_by_asc(users::Column::SubscriptionEndDate)
            .all(self.conn)
            .await
            .context("Failed to query expiring users")
    }

    /// Registrations waiting for an admin decision, oldest first.
    pub async fn pending_approval(&self) -> Result<Vec<users::Model>> {
        users::Entity::find()
            .filter(users::Column::ApprovalStatus.eq(ApprovalStatus::Pending))
            .filter(users::Column::SubscriptionStatus.eq(SubscriptionStatus::PendingApproval))
            .order_by_asc(users::Column::CreatedAt)
            .all(self.conn)
            .await
            .context("Failed to query pending registrations")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}

/// Hash a password using Argon2id with optional custom params.
/// Without a config the `argon2` crate defaults are used.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes on a blocking thread; Argon2 would otherwise stall the runtime.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();

    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Checks `password` against a stored hash on a blocking thread. The
/// parameters are read from the hash itself.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generate a random API key (64 character hex string)
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
