//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::registration::RegistrationService;

/// State shared by the webhook handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub registrations: RegistrationService,
    /// Expected `api-key` header value; `None` disables ingestion
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(registrations: RegistrationService, webhook_secret: Option<String>) -> Self {
        Self {
            registrations,
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}
