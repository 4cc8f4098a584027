//! Verified identity repository trait

use async_trait::async_trait;

use super::entity::{ExternalUserId, VerifiedIdentity};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Repository for verified identities
///
/// Lookups return `Ok(None)` on a miss. `create` reports an existing record
/// for the same account as `DomainError::Conflict`.
#[async_trait]
pub trait IdentityRepository: Send + Sync + std::fmt::Debug {
    /// Get an identity by account
    async fn get(&self, user_id: ExternalUserId) -> Result<Option<VerifiedIdentity>, DomainError>;

    /// Get the first identity verified with this (normalised) email
    async fn find_by_email(&self, email: &str) -> Result<Option<VerifiedIdentity>, DomainError>;

    /// Insert a new identity
    async fn create(&self, identity: VerifiedIdentity) -> Result<VerifiedIdentity, DomainError>;

    /// Atomically move an identity from `expected` to `new`.
    ///
    /// Returns `false` without writing when the identity does not exist or its
    /// current team differs from `expected`.
    async fn assign_team(
        &self,
        user_id: ExternalUserId,
        expected: Option<TeamId>,
        new: Option<TeamId>,
    ) -> Result<bool, DomainError>;

    /// Members of a team, in verification order
    async fn list_members(&self, team_id: TeamId) -> Result<Vec<VerifiedIdentity>, DomainError>;

    /// Number of members of a team
    async fn count_members(&self, team_id: TeamId) -> Result<usize, DomainError>;

    /// Every identity, in verification order
    async fn list(&self) -> Result<Vec<VerifiedIdentity>, DomainError>;
}
