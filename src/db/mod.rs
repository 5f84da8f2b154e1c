use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

use repositories::{
    LabRepository, OrderRepository, PatientRepository, PaymentRepository, UserRepository,
    VisitRepository,
};

/// True when `err` is a unique index violation, i.e. a lost race on a
/// unique column.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

/// Same as [`is_unique_violation`] for a `DbErr` wrapped by a repository.
#[must_use]
pub fn is_unique_violation_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>().is_some_and(is_unique_violation)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to `:memory:` opens its own empty database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Starts a transaction. Inside it, only use repositories built on the
    /// returned handle: an in-memory store has a single connection.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    #[must_use]
    pub const fn users(&self) -> UserRepository<'_, DatabaseConnection> {
        UserRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn payments(&self) -> PaymentRepository<'_, DatabaseConnection> {
        PaymentRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn patients(&self) -> PatientRepository<'_, DatabaseConnection> {
        PatientRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn visits(&self) -> VisitRepository<'_, DatabaseConnection> {
        VisitRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn labs(&self) -> LabRepository<'_, DatabaseConnection> {
        LabRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn orders(&self) -> OrderRepository<'_, DatabaseConnection> {
        OrderRepository::new(&self.conn)
    }
}
