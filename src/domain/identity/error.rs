//! Verification errors

use thiserror::Error;

use crate::domain::{DomainError, Role};

/// Reasons a verification attempt is rejected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerificationError {
    #[error("Account is already verified as a {role}")]
    AlreadyVerified { role: Role },

    #[error("No {role} registration matches that email address and username")]
    NoMatchingRegistration { role: Role },

    #[error("Verification requires a non-empty {0}")]
    InvalidClaim(&'static str),

    #[error(transparent)]
    Storage(#[from] DomainError),
}
