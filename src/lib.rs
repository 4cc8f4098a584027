//! Hackathon registrar
//!
//! Registration intake, identity verification and team formation for a
//! hackathon run on a chat platform:
//! - Registration responses ingested by webhook or CSV import
//! - Verification of chat accounts against those responses
//! - Team creation, membership and a formation deadline
//! - Events for the chat layer to mirror as roles and channels

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::EventPublisher;
use infrastructure::{
    events::{BroadcastEventPublisher, FanoutEventPublisher, TracingEventPublisher},
    identity::VerificationService,
    registration::RegistrationService,
    scheduler::TokioDeadlineScheduler,
    storage::{RecordStore, StorageFactory},
    team::{TeamService, TeamSettings},
};
use tracing::info;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The three services wired to one record store
#[derive(Debug, Clone)]
pub struct Services {
    pub registrations: RegistrationService,
    pub verification: VerificationService,
    pub teams: TeamService,
    /// Subscribe here to receive team events in-process
    pub events: BroadcastEventPublisher,
}

/// Create services over the configured store
pub async fn create_services(config: &AppConfig) -> anyhow::Result<Services> {
    let storage_config = config.storage.to_storage_config();
    info!(backend = ?storage_config.backend(), "Opening record store");

    let store = StorageFactory::create(&storage_config).await?;
    Ok(create_services_with_store(store, config.teams.to_settings()))
}

/// Wire services over an existing store, logging and broadcasting events
pub fn create_services_with_store(store: RecordStore, settings: TeamSettings) -> Services {
    let broadcast = BroadcastEventPublisher::new(EVENT_CHANNEL_CAPACITY);
    let events: Arc<dyn EventPublisher> = Arc::new(
        FanoutEventPublisher::new()
            .with(Arc::new(TracingEventPublisher))
            .with(Arc::new(broadcast.clone())),
    );

    Services {
        registrations: RegistrationService::new(store.registrations.clone()),
        verification: VerificationService::new(
            store.registrations.clone(),
            store.identities.clone(),
        ),
        teams: TeamService::new(
            store.teams,
            store.identities,
            Arc::new(TokioDeadlineScheduler::new()),
            events,
            settings,
        ),
        events: broadcast,
    }
}
