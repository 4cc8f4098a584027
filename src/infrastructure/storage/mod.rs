//! Storage infrastructure - Record store implementations

mod factory;
mod in_memory;
pub mod migrations;
mod sqlite;

pub use factory::{RecordStore, StorageBackend, StorageConfig, StorageFactory};
pub use in_memory::{
    InMemoryIdentityRepository, InMemoryRegistrationRepository, InMemoryTeamRepository,
};
pub use migrations::{Migration, SqliteMigrator};
pub use sqlite::{SqliteConfig, SqliteStorage};
