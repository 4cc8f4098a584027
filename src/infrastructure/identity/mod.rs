//! Identity verification

mod service;

pub use service::VerificationService;
