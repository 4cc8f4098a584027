//! Registration response validation and normalisation

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while recording a registration response
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Registration is missing the '{0}' field")]
    MissingField(&'static str),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Handles are matched exactly, ignoring surrounding whitespace
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_string()
}

pub fn validate_registration_fields(email: &str, handle: &str) -> Result<(), RegistrationError> {
    if email.trim().is_empty() {
        return Err(RegistrationError::MissingField("email"));
    }

    if handle.trim().is_empty() {
        return Err(RegistrationError::MissingField("discord_username"));
    }

    Ok(())
}
