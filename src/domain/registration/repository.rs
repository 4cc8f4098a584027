//! Registration response repository trait

use async_trait::async_trait;

use super::entity::RegistrationResponse;
use crate::domain::{DomainError, Role};

/// Append-only log of registration responses
#[async_trait]
pub trait RegistrationRepository: Send + Sync + std::fmt::Debug {
    /// Append a response to the log
    async fn append(&self, response: RegistrationResponse)
        -> Result<RegistrationResponse, DomainError>;

    /// Check whether any response matches the normalised claim exactly
    async fn exists_matching(
        &self,
        role: Role,
        email: &str,
        handle: &str,
    ) -> Result<bool, DomainError>;

    /// Count responses, optionally restricted to one role
    async fn count(&self, role: Option<Role>) -> Result<usize, DomainError>;
}


#[cfg(test)]
mod tests {
    use super::mock::MockRegistrationRepository;
    use super::*;

    #[tokio::test]
    async fn test_mock_append_and_match() {
        let repo = MockRegistrationRepository::new();
        let response = RegistrationResponse::new(Role::Participant, "a@x.com", "alice#1").unwrap();

        repo.append(response).await.unwrap();

        assert!(repo
            .exists_matching(Role::Participant, "a@x.com", "alice#1")
            .await
            .unwrap());
        assert!(!repo
            .exists_matching(Role::Mentor, "a@x.com", "alice#1")
            .await
            .unwrap());
        assert_eq!(repo.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mock_error() {
        let repo = MockRegistrationRepository::new().with_error("disk full");
        let response = RegistrationResponse::new(Role::Judge, "j@x.com", "judge").unwrap();

        let result = repo.append(response).await;
        assert!(matches!(result, Err(DomainError::StorageUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_mock_fail_after() {
        let repo = MockRegistrationRepository::new().fail_after(1, "disk full");

        let first = RegistrationResponse::new(Role::Judge, "j@x.com", "judge").unwrap();
        let second = RegistrationResponse::new(Role::Judge, "k@x.com", "judge2").unwrap();

        assert!(repo.append(first).await.is_ok());
        assert!(repo.append(second).await.is_err());
    }
}
