//! Event role tracks

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// The track an account registers and verifies under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Participant,
    Mentor,
    Judge,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Participant, Role::Mentor, Role::Judge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Mentor => "mentor",
            Self::Judge => "judge",
        }
    }

    /// Only participants may form or join teams
    pub fn can_join_teams(&self) -> bool {
        matches!(self, Self::Participant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "participant" => Ok(Self::Participant),
            "mentor" => Ok(Self::Mentor),
            "judge" => Ok(Self::Judge),
            other => Err(DomainError::validation(format!("Unknown role '{}'", other))),
        }
    }
}
