//! Registration response entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{
    normalize_email, normalize_handle, validate_registration_fields, RegistrationError,
};
use crate::domain::Role;

/// A raw registration form submission, used as the verification allow-list.
///
/// Responses form an append-only log: several may share an email or handle
/// and none is ever modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    role: Role,
    email: String,
    handle: String,
    received_at: DateTime<Utc>,
}

impl RegistrationResponse {
    /// Create a new response with normalised email and handle
    pub fn new(
        role: Role,
        email: impl AsRef<str>,
        handle: impl AsRef<str>,
    ) -> Result<Self, RegistrationError> {
        let (email, handle) = (email.as_ref(), handle.as_ref());
        validate_registration_fields(email, handle)?;

        Ok(Self {
            role,
            email: normalize_email(email),
            handle: normalize_handle(handle),
            received_at: Utc::now(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Whether this response vouches for the given (normalised) claim
    pub fn matches(&self, role: Role, email: &str, handle: &str) -> bool {
        self.role == role && self.email == email && self.handle == handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_normalised() {
        let response =
            RegistrationResponse::new(Role::Participant, " A@X.com", "alice#1 ").unwrap();

        assert_eq!(response.email(), "a@x.com");
        assert_eq!(response.handle(), "alice#1");
        assert_eq!(response.role(), Role::Participant);
    }

    #[test]
    fn test_response_requires_fields() {
        assert!(RegistrationResponse::new(Role::Mentor, "", "bob").is_err());
        assert!(RegistrationResponse::new(Role::Mentor, "b@x.com", "").is_err());
    }

    #[test]
    fn test_matches_requires_every_field() {
        let response = RegistrationResponse::new(Role::Participant, "a@x.com", "alice#1").unwrap();

        assert!(response.matches(Role::Participant, "a@x.com", "alice#1"));
        assert!(!response.matches(Role::Mentor, "a@x.com", "alice#1"));
        assert!(!response.matches(Role::Participant, "b@x.com", "alice#1"));
        assert!(!response.matches(Role::Participant, "a@x.com", "alice#2"));
    }
}
