//! Team operation errors

use thiserror::Error;

use super::entity::TeamId;
use super::validation::TeamValidationError;
use crate::domain::DomainError;

/// Reasons a team operation is rejected.
///
/// Each precondition of a team operation has its own variant so the chat
/// layer can render a specific message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamError {
    #[error("Invalid team name: {0}")]
    InvalidName(#[from] TeamValidationError),

    #[error("There is already a team named '{name}'")]
    NameTaken { name: String },

    #[error("You are not currently in a team")]
    ActorNotTeamed,

    #[error("You are not currently in a team")]
    NotTeamed,

    #[error("Team is full; teams can have at most {max} members")]
    TeamFull { max: usize },

    #[error("Only verified participants can join teams")]
    TargetUnverified,

    #[error("That member is already in a team")]
    TargetAlreadyTeamed,

    #[error("Only verified participants can create teams")]
    OwnerUnverified,

    #[error("You must leave your current team first")]
    AlreadyTeamed,

    #[error("Team {0} does not exist")]
    TeamNotFound(TeamId),

    #[error(transparent)]
    Storage(#[from] DomainError),
}
