use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveModelTrait, Set};

use crate::db::repositories::user::hash_password;
use crate::entities::enums::{ApprovalStatus, Plan, Role, SubscriptionStatus};
use crate::entities::users;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Well-known key of the seeded admin; regenerate it after first login.
pub const DEFAULT_ADMIN_API_KEY: &str = "labflow_default_admin_api_key_please_regenerate";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let now = chrono::Utc::now();

        let password_hash =
            hash_password("password", None).map_err(|e| DbErr::Custom(e.to_string()))?;

        let admin = users::ActiveModel {
            username: Set("admin".to_string()),
            email: Set("admin@labflow.local".to_string()),
            password_hash: Set(password_hash),
            api_key: Set(DEFAULT_ADMIN_API_KEY.to_string()),
            full_name: Set("Administrator".to_string()),
            role: Set(Role::Admin),
            subscription_status: Set(SubscriptionStatus::Active),
            subscription_plan: Set(Plan::Enterprise),
            subscription_start_date: Set(None),
            subscription_end_date: Set(None),
            last_payment_date: Set(None),
            total_paid: Set(0),
            approval_status: Set(ApprovalStatus::Approved),
            approved_by: Set(None),
            approved_at: Set(Some(now)),
            rejection_reason: Set(None),
            is_active: Set(true),
            login_attempts: Set(0),
            lock_until: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        admin.insert(db).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(users::Entity)
            .and_where(Expr::col(users::Column::Username).eq("admin"))
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
