//! Authentication error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid client secrets file: {0}")]
    ClientSecrets(String),

    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("CSRF token mismatch in OAuth callback")]
    CsrfMismatch,

    #[error("Port {0} already in use for OAuth callback")]
    PortInUse(u16),

    #[error("Invalid token")]
    InvalidToken,
}

impl AuthError {
    /// Whether running the interactive flow again could fix this.
    pub fn needs_reauthorization(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::InvalidToken)
    }
}
