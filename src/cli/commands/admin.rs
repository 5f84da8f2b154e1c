use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

pub async fn cmd_create_admin(
    config: &Config,
    username: &str,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let service = SeaOrmAuthService::new(
        store.clone(),
        config.security.clone(),
        config.subscription.clone(),
    );

    let account = service
        .create_admin(username, email, password, full_name.unwrap_or(username))
        .await?;

    println!("✓ Administrator ready: {} <{}>", account.username, account.email);
    println!("  ID: {}", account.id);

    if let Some(user) = store.users().get_by_id(account.id).await? {
        println!("  API key: {}", user.api_key);
    }

    Ok(())
}
