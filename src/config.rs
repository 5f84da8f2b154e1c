use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::lockout::LockoutPolicy;
use crate::domain::pricing::{MAX_DURATION_MONTHS, MIN_DURATION_MONTHS};
use crate::entities::enums::Currency;

const MAX_UTC_OFFSET_HOURS: i32 = 14;
const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub subscription: SubscriptionConfig,

    pub clinic: ClinicConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/labflow.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub lockout: LockoutConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            lockout: LockoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Consecutive failed logins before the account is locked.
    pub max_attempts: u32,

    pub lockout_minutes: u32,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_minutes: 30,
        }
    }
}

impl LockoutConfig {
    #[must_use]
    pub const fn policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.max_attempts,
            lockout_minutes: self.lockout_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Accounts with this many days or fewer left count as expiring.
    pub expiring_threshold_days: i64,

    /// Days between payment creation and its due date.
    pub payment_due_days: i64,

    /// Duration priced into the payment created at registration.
    pub registration_duration_months: u32,

    pub currency: Currency,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            expiring_threshold_days: 7,
            payment_due_days: 7,
            registration_duration_months: 1,
            currency: Currency::Thb,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Local offset used to decide which month a new LN or reference
    /// number belongs to.
    pub utc_offset_hours: i32,

    /// Attempts per allocation before a duplicate code is reported.
    pub sequence_max_attempts: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 7,
            sequence_max_attempts: 5,
        }
    }
}

impl ClinicConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .with_context(|| format!("Invalid UTC offset: {} hours", self.utc_offset_hours))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)?
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// `LABFLOW_DATABASE_PATH`, `LABFLOW_PORT` and `LABFLOW_LOG_LEVEL` win
    /// over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("LABFLOW_DATABASE_PATH") {
            self.general.database_path = path;
        }

        if let Ok(port) = std::env::var("LABFLOW_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid LABFLOW_PORT: {port}"))?;
        }

        if let Ok(level) = std::env::var("LABFLOW_LOG_LEVEL") {
            self.general.log_level = level;
        }

        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("labflow").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".labflow").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.lockout.max_attempts == 0 {
            anyhow::bail!("security.lockout.max_attempts must be > 0");
        }

        if self.clinic.sequence_max_attempts == 0 {
            anyhow::bail!("clinic.sequence_max_attempts must be > 0");
        }

        if self.clinic.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            anyhow::bail!(
                "clinic.utc_offset_hours must be within ±{MAX_UTC_OFFSET_HOURS}, got {}",
                self.clinic.utc_offset_hours
            );
        }

        let months = self.subscription.registration_duration_months;
        if !(MIN_DURATION_MONTHS..=MAX_DURATION_MONTHS).contains(&months) {
            anyhow::bail!(
                "subscription.registration_duration_months must be between {MIN_DURATION_MONTHS} and {MAX_DURATION_MONTHS}, got {months}"
            );
        }

        let due_days = self.subscription.payment_due_days;
        if !(1..=MAX_WINDOW_DAYS).contains(&due_days) {
            anyhow::bail!(
                "subscription.payment_due_days must be between 1 and {MAX_WINDOW_DAYS}, got {due_days}"
            );
        }

        let threshold = self.subscription.expiring_threshold_days;
        if !(0..=MAX_WINDOW_DAYS).contains(&threshold) {
            anyhow::bail!(
                "subscription.expiring_threshold_days must be between 0 and {MAX_WINDOW_DAYS}, got {threshold}"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.lockout.max_attempts, 5);
        assert_eq!(config.security.lockout.lockout_minutes, 30);
        assert_eq!(config.subscription.expiring_threshold_days, 7);
        assert_eq!(config.subscription.currency, Currency::Thb);
        assert_eq!(config.clinic.utc_offset_hours, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[clinic]"));
        assert!(toml_str.contains("[security.lockout]"));
        assert!(toml_str.contains("currency = \"THB\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [clinic]
            utc_offset_hours = -5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.clinic.utc_offset_hours, -5);
        assert_eq!(config.clinic.sequence_max_attempts, 5);
        assert_eq!(config.server.port, 6790);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.clinic.utc_offset_hours = 15;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.lockout.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subscription.registration_duration_months = 37;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subscription.payment_due_days = -3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subscription.payment_due_days = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subscription.expiring_threshold_days = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.subscription.expiring_threshold_days = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clinic_offset() {
        let clinic = ClinicConfig::default();
        assert_eq!(clinic.offset().unwrap().local_minus_utc(), 7 * 3600);
    }
}
