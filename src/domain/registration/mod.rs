//! Registration domain module
//!
//! Registration responses are the allow-list that verification matches
//! against. They are ingested by the webhook receiver or bulk import.

mod entity;
mod repository;
mod validation;

pub use entity::RegistrationResponse;
pub use repository::RegistrationRepository;
pub use validation::{
    normalize_email, normalize_handle, validate_registration_fields, RegistrationError,
};

#[cfg(test)]
pub use repository::mock;
