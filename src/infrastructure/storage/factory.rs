//! Storage factory for runtime backend selection

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, IdentityRepository, RegistrationRepository, TeamRepository};

use super::in_memory::{
    InMemoryIdentityRepository, InMemoryRegistrationRepository, InMemoryTeamRepository,
};
use super::sqlite::{SqliteConfig, SqliteStorage};

/// Supported storage backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory storage (for testing/development)
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::Memory),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Memory,
    Sqlite(SqliteConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::Memory
    }

    pub fn sqlite(config: SqliteConfig) -> Self {
        Self::Sqlite(config)
    }

    pub fn sqlite_path(path: impl Into<String>) -> Self {
        Self::Sqlite(SqliteConfig::new(path))
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::Memory => StorageBackend::Memory,
            Self::Sqlite(_) => StorageBackend::Sqlite,
        }
    }
}

/// The three record collections, each behind its repository trait
#[derive(Debug, Clone)]
pub struct RecordStore {
    pub registrations: Arc<dyn RegistrationRepository>,
    pub identities: Arc<dyn IdentityRepository>,
    pub teams: Arc<dyn TeamRepository>,
}

impl RecordStore {
    pub fn in_memory() -> Self {
        Self {
            registrations: Arc::new(InMemoryRegistrationRepository::new()),
            identities: Arc::new(InMemoryIdentityRepository::new()),
            teams: Arc::new(InMemoryTeamRepository::new()),
        }
    }

    /// One SQLite pool shared by all three repositories
    pub fn from_sqlite(storage: SqliteStorage) -> Self {
        let storage = Arc::new(storage);
        Self {
            registrations: storage.clone(),
            identities: storage.clone(),
            teams: storage,
        }
    }
}

/// Factory for creating record stores
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a record store for the configured backend, migrating SQLite
    /// schemas before returning
    pub async fn create(config: &StorageConfig) -> Result<RecordStore, DomainError> {
        match config {
            StorageConfig::Memory => Ok(RecordStore::in_memory()),
            StorageConfig::Sqlite(sqlite_config) => {
                let storage = SqliteStorage::connect(sqlite_config).await?;
                storage.migrate().await?;
                Ok(RecordStore::from_sqlite(storage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::parse("In-Memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::parse("sqlite"), Some(StorageBackend::Sqlite));
        assert_eq!(StorageBackend::parse("postgres"), None);
    }

    #[test]
    fn test_storage_config_backend() {
        assert_eq!(StorageConfig::in_memory().backend(), StorageBackend::Memory);
        assert_eq!(
            StorageConfig::sqlite_path("records.db").backend(),
            StorageBackend::Sqlite
        );
    }

    #[tokio::test]
    async fn test_create_in_memory_store() {
        let store = StorageFactory::create(&StorageConfig::in_memory()).await.unwrap();

        assert_eq!(store.registrations.count(None).await.unwrap(), 0);
        assert!(store.teams.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sqlite_store_shares_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let config = StorageConfig::sqlite_path(path.to_string_lossy());

        let store = StorageFactory::create(&config).await.unwrap();
        let team = store.teams.create("Rockets").await.unwrap();

        assert_eq!(store.identities.count_members(team.id()).await.unwrap(), 0);
        assert!(path.exists());
    }
}
