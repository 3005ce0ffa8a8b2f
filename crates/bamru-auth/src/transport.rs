//! HTTP client pre-configured with a bearer token.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::AuthError;

/// A `reqwest::Client` that sends `Authorization: Bearer <token>` on every
/// request.
#[derive(Debug, Clone)]
pub struct AuthorizedTransport {
    client: reqwest::Client,
}

impl AuthorizedTransport {
    pub fn from_access_token(access_token: &str) -> Result<Self, AuthError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| AuthError::InvalidToken)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AuthError::OAuthFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}
