//! Events emitted for the chat-platform layer
//!
//! The core never talks to the chat platform. It publishes these events and
//! the collaborator grants or revokes roles and creates or deletes channels.

use serde::{Deserialize, Serialize};

use super::identity::ExternalUserId;
use super::team::{BucketPlacement, Team, TeamId};

/// Why a team was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbandReason {
    /// The last member left
    Emptied,
    /// Fewer than two members when the formation deadline fired
    FormationTimeout,
    /// Removed by an organizer
    Organizer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamEvent {
    TeamCreated {
        team: Team,
        placement: BucketPlacement,
    },
    TeamDisbanded {
        team: Team,
        reason: DisbandReason,
    },
    MembershipChanged {
        user_id: ExternalUserId,
        before: Option<TeamId>,
        after: Option<TeamId>,
    },
}

impl TeamEvent {
    pub fn membership(
        user_id: ExternalUserId,
        before: Option<TeamId>,
        after: Option<TeamId>,
    ) -> Self {
        Self::MembershipChanged {
            user_id,
            before,
            after,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TeamCreated { .. } => "team_created",
            Self::TeamDisbanded { .. } => "team_disbanded",
            Self::MembershipChanged { .. } => "membership_changed",
        }
    }
}

/// Sink for team events.
///
/// Publishing must not block: services call it while holding a team lock.
pub trait EventPublisher: Send + Sync + std::fmt::Debug {
    fn publish(&self, event: TeamEvent);
}
