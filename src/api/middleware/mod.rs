//! API middleware components

pub mod auth;
pub mod logging;

pub use auth::RequireSharedSecret;
pub use logging::logging_middleware;
