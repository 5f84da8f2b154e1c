use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, AuthService, LabService, MembershipService, OrderService, RegistryService,
    SeaOrmAccountService, SeaOrmAuthService, SeaOrmLabService, SeaOrmMembershipService,
    SeaOrmOrderService, SeaOrmRegistryService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub membership_service: Arc<dyn MembershipService>,

    pub account_service: Arc<dyn AccountService>,

    pub registry_service: Arc<dyn RegistryService>,

    pub lab_service: Arc<dyn LabService>,

    pub order_service: Arc<dyn OrderService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    /// Wires every service onto an already migrated store.
    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let offset = config.clinic.offset()?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
            config.subscription.clone(),
        )) as Arc<dyn AuthService>;

        let membership_service = Arc::new(SeaOrmMembershipService::new(
            store.clone(),
            config.subscription.clone(),
        )) as Arc<dyn MembershipService>;

        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            config.subscription.clone(),
        )) as Arc<dyn AccountService>;

        let registry_service = Arc::new(SeaOrmRegistryService::new(
            store.clone(),
            offset,
            config.clinic.sequence_max_attempts,
        )) as Arc<dyn RegistryService>;

        let lab_service = Arc::new(SeaOrmLabService::new(store.clone())) as Arc<dyn LabService>;

        let order_service =
            Arc::new(SeaOrmOrderService::new(store.clone())) as Arc<dyn OrderService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            membership_service,
            account_service,
            registry_service,
            lab_service,
            order_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
