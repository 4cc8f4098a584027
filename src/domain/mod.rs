//! Domain layer - Core records, rules and events

pub mod error;
pub mod event;
pub mod identity;
pub mod registration;
pub mod role;
pub mod team;

pub use error::DomainError;
pub use event::{DisbandReason, EventPublisher, TeamEvent};
pub use identity::{ExternalUserId, IdentityRepository, VerificationError, VerifiedIdentity};
pub use registration::{RegistrationError, RegistrationRepository, RegistrationResponse};
pub use role::Role;
pub use team::{
    BucketPlacement, ChannelBundle, Team, TeamError, TeamId, TeamRepository, TeamValidationError,
};
