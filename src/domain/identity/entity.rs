//! Verified identity entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::team::TeamId;
use crate::domain::Role;

/// Chat-platform account identifier (a Discord snowflake)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalUserId(u64);

impl ExternalUserId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ExternalUserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ExternalUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account confirmed to match a registration response.
///
/// Identities are never deleted. Team membership is the only mutable field and
/// is changed exclusively through the identity repository's compare-and-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    user_id: ExternalUserId,
    role: Role,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<TeamId>,
    verified_at: DateTime<Utc>,
}

impl VerifiedIdentity {
    /// Create a freshly verified identity with no team
    pub fn new(user_id: ExternalUserId, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            email: email.into(),
            team_id: None,
            verified_at: Utc::now(),
        }
    }

    /// Rebuild an identity read back from a store
    pub fn restore(
        user_id: ExternalUserId,
        role: Role,
        email: String,
        team_id: Option<TeamId>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            role,
            email,
            team_id,
            verified_at,
        }
    }

    pub fn user_id(&self) -> ExternalUserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }

    pub fn is_teamed(&self) -> bool {
        self.team_id.is_some()
    }

    pub(crate) fn set_team_id(&mut self, team_id: Option<TeamId>) {
        self.team_id = team_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_has_no_team() {
        let identity = VerifiedIdentity::new(ExternalUserId::new(42), Role::Participant, "a@x.com");

        assert_eq!(identity.user_id().value(), 42);
        assert_eq!(identity.role(), Role::Participant);
        assert!(identity.team_id().is_none());
        assert!(!identity.is_teamed());
    }

    #[test]
    fn test_user_id_serializes_as_number() {
        let json = serde_json::to_string(&ExternalUserId::new(1_234_567_890_123)).unwrap();
        assert_eq!(json, "1234567890123");
    }
}
