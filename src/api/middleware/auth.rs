//! Shared-secret authentication for the webhook ingester

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Headers checked for the shared secret, in order
pub const SECRET_HEADERS: [&str; 2] = ["api-key", "x-api-key"];

/// Extractor that rejects requests without the configured shared secret.
///
/// Every failure is a 403, including when no secret is configured.
#[derive(Debug, Clone, Copy)]
pub struct RequireSharedSecret;

impl FromRequestParts<AppState> for RequireSharedSecret {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.webhook_secret.as_deref() else {
            debug!("Webhook request rejected: no shared secret configured");
            return Err(ApiError::forbidden("Webhook ingestion is disabled"));
        };

        let provided = extract_secret_from_headers(&parts.headers)?;

        if !secrets_match(provided, expected) {
            debug!("Webhook request rejected: wrong shared secret");
            return Err(ApiError::forbidden("Invalid API key"));
        }

        Ok(RequireSharedSecret)
    }
}

fn extract_secret_from_headers(headers: &HeaderMap) -> Result<&str, ApiError> {
    for name in SECRET_HEADERS {
        if let Some(value) = headers.get(name) {
            return value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::forbidden("Invalid API key header encoding"));
        }
    }

    Err(ApiError::forbidden(
        "API key required. Provide it via the 'api-key' header",
    ))
}

fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_extract_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert("api-key", " hunter2 ".parse().unwrap());

        assert_eq!(extract_secret_from_headers(&headers).unwrap(), "hunter2");
    }

    #[test]
    fn test_api_key_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "second".parse().unwrap());
        headers.insert("api-key", "first".parse().unwrap());

        assert_eq!(extract_secret_from_headers(&headers).unwrap(), "first");
    }

    #[test]
    fn test_missing_header_is_forbidden() {
        let err = extract_secret_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("hunter2", "hunter2"));
        assert!(!secrets_match("hunter", "hunter2"));
        assert!(!secrets_match("", "hunter2"));
    }
}
