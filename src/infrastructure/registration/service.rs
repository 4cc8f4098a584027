//! Registration service for the verification allow-list

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::registration::{RegistrationError, RegistrationRepository, RegistrationResponse};
use crate::domain::{DomainError, Role};

/// Records registration responses submitted by the webhook or bulk import
#[derive(Debug, Clone)]
pub struct RegistrationService {
    repository: Arc<dyn RegistrationRepository>,
}

impl RegistrationService {
    pub fn new(repository: Arc<dyn RegistrationRepository>) -> Self {
        Self { repository }
    }

    /// Append one response; email is lowercased and both fields are trimmed
    pub async fn submit(
        &self,
        role: Role,
        email: &str,
        handle: &str,
    ) -> Result<RegistrationResponse, RegistrationError> {
        let response = RegistrationResponse::new(role, email, handle).inspect_err(|e| {
            debug!(role = %role, error = %e, "Rejected registration");
        })?;

        let response = self.repository.append(response).await.inspect_err(|e| {
            warn!(role = %role, error = %e, "Failed to store registration");
        })?;

        info!(role = %role, email = %response.email(), "Registration recorded");
        Ok(response)
    }

    /// Number of stored responses, optionally for one role
    pub async fn count(&self, role: Option<Role>) -> Result<usize, DomainError> {
        self.repository.count(role).await
    }
}
