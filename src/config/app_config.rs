use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::storage::{SqliteConfig, StorageBackend, StorageConfig};
use crate::infrastructure::team::TeamSettings;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub teams: TeamsConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    pub max_size: usize,
    pub formation_timeout_secs: u64,
    pub bucket_size: u32,
    pub max_name_length: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret expected in the `api-key` header; unset rejects everything
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: "records.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for TeamsConfig {
    fn default() -> Self {
        let settings = TeamSettings::default();
        Self {
            max_size: settings.max_size,
            formation_timeout_secs: settings.formation_timeout.as_secs(),
            bucket_size: settings.bucket_size,
            max_name_length: settings.max_name_length,
        }
    }
}

impl StorageSettings {
    pub fn to_storage_config(&self) -> StorageConfig {
        match self.backend {
            StorageBackend::Memory => StorageConfig::in_memory(),
            StorageBackend::Sqlite => StorageConfig::sqlite(
                SqliteConfig::new(&self.path).with_max_connections(self.max_connections),
            ),
        }
    }
}

impl TeamsConfig {
    pub fn to_settings(&self) -> TeamSettings {
        TeamSettings {
            max_size: self.max_size,
            formation_timeout: Duration::from_secs(self.formation_timeout_secs),
            bucket_size: self.bucket_size,
            max_name_length: self.max_name_length,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Rejects values the services cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.teams.max_size < 2 {
            return Err(DomainError::configuration(format!(
                "teams.max_size must be at least 2, got {}",
                self.teams.max_size
            )));
        }

        if self.teams.bucket_size == 0 {
            return Err(DomainError::configuration("teams.bucket_size must be positive"));
        }

        if self.teams.max_name_length == 0 {
            return Err(DomainError::configuration(
                "teams.max_name_length must be positive",
            ));
        }

        if self
            .webhook
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(DomainError::configuration("webhook.api_key must not be empty"));
        }

        if self.storage.max_connections == 0 {
            return Err(DomainError::configuration(
                "storage.max_connections must be positive",
            ));
        }

        Ok(())
    }
}
