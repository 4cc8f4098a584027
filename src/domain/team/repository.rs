//! Team repository trait

use async_trait::async_trait;

use super::entity::{ChannelBundle, Team, TeamId};
use crate::domain::DomainError;

/// Repository for managing teams
///
/// Names are unique among existing teams; a clash on `create` or `rename` is
/// reported as `DomainError::Conflict`.
#[async_trait]
pub trait TeamRepository: Send + Sync + std::fmt::Debug {
    /// Allocate a new team with the next id
    async fn create(&self, name: &str) -> Result<Team, DomainError>;

    /// Get a team by ID
    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError>;

    /// Get a team by exact name
    async fn find_by_name(&self, name: &str) -> Result<Option<Team>, DomainError>;

    /// Change a team's name
    async fn rename(&self, id: TeamId, name: &str) -> Result<Team, DomainError>;

    /// Record the chat-platform resources provisioned for a team
    async fn attach_channels(&self, id: TeamId, channels: ChannelBundle)
        -> Result<Team, DomainError>;

    /// Delete a team by ID, returns true if it existed
    async fn delete(&self, id: TeamId) -> Result<bool, DomainError>;

    /// All existing teams ordered by id
    async fn list(&self) -> Result<Vec<Team>, DomainError>;

    /// Ids of all existing teams, ascending
    async fn existing_ids(&self) -> Result<Vec<TeamId>, DomainError> {
        Ok(self.list().await?.iter().map(Team::id).collect())
    }
}
