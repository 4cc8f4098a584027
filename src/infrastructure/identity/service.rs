//! Verification service: promotes registration matches to verified identities

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::identity::{
    ExternalUserId, IdentityRepository, VerificationError, VerifiedIdentity,
};
use crate::domain::registration::{normalize_email, normalize_handle, RegistrationRepository};
use crate::domain::Role;
use crate::infrastructure::locks::KeyedLocks;

/// Verification service
///
/// Every identity is created through [`VerificationService::promote`], under
/// a per-account lock, so the first verification of an account wins.
#[derive(Debug, Clone)]
pub struct VerificationService {
    registrations: Arc<dyn RegistrationRepository>,
    identities: Arc<dyn IdentityRepository>,
    locks: Arc<KeyedLocks<ExternalUserId>>,
}

impl VerificationService {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        identities: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            registrations,
            identities,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Verify an account against the registration allow-list
    pub async fn verify(
        &self,
        user_id: ExternalUserId,
        handle: &str,
        email: &str,
        role: Role,
    ) -> Result<VerifiedIdentity, VerificationError> {
        let email = normalize_email(email);
        let handle = normalize_handle(handle);

        if handle.is_empty() {
            return Err(VerificationError::InvalidClaim("handle"));
        }
        if email.is_empty() {
            return Err(VerificationError::InvalidClaim("email"));
        }

        let _guard = self.locks.lock(user_id).await;

        if let Some(existing) = self.identities.get(user_id).await? {
            debug!(user_id = %user_id, role = %existing.role(), "Account already verified");
            return Err(VerificationError::AlreadyVerified {
                role: existing.role(),
            });
        }

        if !self.registrations.exists_matching(role, &email, &handle).await? {
            debug!(user_id = %user_id, role = %role, "No matching registration");
            return Err(VerificationError::NoMatchingRegistration { role });
        }

        self.promote(VerifiedIdentity::new(user_id, role, email)).await
    }

    /// Organizer override: skips the registration match but not the
    /// already-verified check
    pub async fn override_verify(
        &self,
        user_id: ExternalUserId,
        email: &str,
        role: Role,
    ) -> Result<VerifiedIdentity, VerificationError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(VerificationError::InvalidClaim("email"));
        }

        let _guard = self.locks.lock(user_id).await;

        if let Some(existing) = self.identities.get(user_id).await? {
            return Err(VerificationError::AlreadyVerified {
                role: existing.role(),
            });
        }

        info!(user_id = %user_id, role = %role, "Verification override");
        self.promote(VerifiedIdentity::new(user_id, role, email)).await
    }

    /// Look up a verified identity
    pub async fn get(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Option<VerifiedIdentity>, VerificationError> {
        Ok(self.identities.get(user_id).await?)
    }

    // The store rejects a second row for the same account even if the lock
    // was bypassed by another process
    async fn promote(
        &self,
        identity: VerifiedIdentity,
    ) -> Result<VerifiedIdentity, VerificationError> {
        let user_id = identity.user_id();
        let role = identity.role();

        match self.identities.create(identity).await {
            Ok(identity) => {
                info!(user_id = %user_id, role = %role, "Account verified");
                Ok(identity)
            }
            Err(e) if e.is_conflict() => {
                let role = self
                    .identities
                    .get(user_id)
                    .await?
                    .map_or(role, |existing| existing.role());
                Err(VerificationError::AlreadyVerified { role })
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to store verified identity");
                Err(e.into())
            }
        }
    }
}
