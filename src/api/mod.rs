//! API layer - webhook ingester and health endpoints

pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod webhook;

pub use middleware::RequireSharedSecret;
pub use router::create_router;
pub use state::AppState;
