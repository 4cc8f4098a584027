//! Team validation

use thiserror::Error;

/// Errors that can occur during team validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team name cannot be empty")]
    EmptyName,

    #[error("Team name cannot exceed {0} characters")]
    NameTooLong(usize),
}

pub const DEFAULT_MAX_TEAM_NAME_LENGTH: usize = 90;

/// Validate a team name, returning it trimmed.
///
/// Length is counted in characters, not bytes.
pub fn validate_team_name(name: &str, max_length: usize) -> Result<String, TeamValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(TeamValidationError::EmptyName);
    }

    if name.chars().count() > max_length {
        return Err(TeamValidationError::NameTooLong(max_length));
    }

    Ok(name.to_string())
}
