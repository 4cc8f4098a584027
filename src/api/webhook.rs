//! Registration-form webhook ingester

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::middleware::RequireSharedSecret;
use super::state::AppState;
use super::types::{ApiError, Json};
use crate::domain::Role;

/// Body posted by the registration form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushRegistrationRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub discord_username: Option<String>,
}

/// The normalised values that were stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRegistrationResponse {
    pub role: Role,
    pub email: String,
    pub discord_username: String,
}

/// POST /push/{role}
pub async fn push_registration(
    _auth: RequireSharedSecret,
    State(state): State<AppState>,
    Path(role): Path<String>,
    Json(request): Json<PushRegistrationRequest>,
) -> Result<Json<PushRegistrationResponse>, ApiError> {
    let role: Role = role
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown registration role '{}'", role)))?;

    debug!(role = %role, "Registration webhook received");

    let response = state
        .registrations
        .submit(
            role,
            request.email.as_deref().unwrap_or_default(),
            request.discord_username.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(PushRegistrationResponse {
        role,
        email: response.email().to_string(),
        discord_username: response.handle().to_string(),
    }))
}
