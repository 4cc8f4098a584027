//! Infrastructure layer - stores, services and runtime plumbing

pub mod events;
pub mod identity;
pub mod locks;
pub mod logging;
pub mod registration;
pub mod scheduler;
pub mod storage;
pub mod team;
