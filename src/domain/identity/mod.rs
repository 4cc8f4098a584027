//! Identity domain module
//!
//! A verified identity is the unit that can be teamed. One account holds at
//! most one verified identity: the first successful verification fixes its role.

mod entity;
mod error;
mod repository;

pub use entity::{ExternalUserId, VerifiedIdentity};
pub use error::VerificationError;
pub use repository::IdentityRepository;
