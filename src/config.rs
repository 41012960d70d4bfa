//! Runtime configuration loaded from TOML.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::AccountCreate;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CAFE_CONFIG";

/// Longest accepted token lifetime or lockout: thirty days.
pub const MAX_DURATION_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.message().to_string())
    }
}

/// The administrator account created at startup.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSeed {
    pub username: String,
    pub name: String,
    pub password: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            name: "Administrator".to_string(),
            password: "change-me-please".to_string(),
        }
    }
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AdminSeed {
    pub fn to_account(&self) -> AccountCreate {
        AccountCreate::new(&self.username, &self.name, &self.password)
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CafeConfig {
    /// Capacity of every actor's request channel.
    pub channel_buffer: usize,
    pub token_secret: String,
    pub token_lifetime_secs: i64,
    /// How often an active session rechecks its expiry. At most one minute.
    pub expiry_check_secs: u64,
    pub max_login_attempts: u32,
    pub lockout_secs: i64,
    /// Argon2id memory cost in KiB.
    pub password_memory_kib: u32,
    pub password_iterations: u32,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub admin: AdminSeed,
}

impl Default for CafeConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 32,
            token_secret: "cafe-counter-development-secret".to_string(),
            token_lifetime_secs: 3600,
            expiry_check_secs: 60,
            max_login_attempts: 3,
            lockout_secs: 600,
            password_memory_kib: 19 * 1024,
            password_iterations: 2,
            log_filter: "info".to_string(),
            admin: AdminSeed::default(),
        }
    }
}

impl std::fmt::Debug for CafeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CafeConfig")
            .field("channel_buffer", &self.channel_buffer)
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("expiry_check_secs", &self.expiry_check_secs)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("lockout_secs", &self.lockout_secs)
            .field("password_memory_kib", &self.password_memory_kib)
            .field("password_iterations", &self.password_iterations)
            .field("log_filter", &self.log_filter)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl CafeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: CafeConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reads the file named by `CAFE_CONFIG`, or falls back to defaults when
    /// the variable is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_buffer == 0 {
            return Err(ConfigError::Validation(
                "channel_buffer must be greater than 0".to_string(),
            ));
        }
        if self.token_secret.is_empty() {
            return Err(ConfigError::Validation(
                "token_secret must not be empty".to_string(),
            ));
        }
        check_duration("token_lifetime_secs", self.token_lifetime_secs)?;
        if !(1..=60).contains(&self.expiry_check_secs) {
            return Err(ConfigError::Validation(format!(
                "expiry_check_secs must be between 1 and 60, got {}",
                self.expiry_check_secs
            )));
        }
        if self.max_login_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_login_attempts must be greater than 0".to_string(),
            ));
        }
        check_duration("lockout_secs", self.lockout_secs)?;
        if self.password_memory_kib < 8 || self.password_iterations == 0 {
            return Err(ConfigError::Validation(format!(
                "password hashing needs at least 8 KiB and 1 iteration, got {} KiB and {}",
                self.password_memory_kib, self.password_iterations
            )));
        }
        self.admin
            .to_account()
            .validate()
            .map_err(|e| ConfigError::Validation(format!("admin: {}", e)))
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::seconds(self.token_lifetime_secs)
    }

    pub fn lockout(&self) -> Duration {
        Duration::seconds(self.lockout_secs)
    }

    pub fn expiry_check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expiry_check_secs)
    }
}

fn check_duration(name: &str, secs: i64) -> Result<(), ConfigError> {
    if !(1..=MAX_DURATION_SECS).contains(&secs) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_DURATION_SECS, secs
        )));
    }
    Ok(())
}
