//! Google credential provider for Calendar access.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AuthError;
use crate::oauth::InstalledAppFlow;
use crate::storage::{TokenSet, TokenStore};
use crate::transport::AuthorizedTransport;
use crate::CredentialProvider;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to calendars and events.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth client registration, as found in the JSON downloaded from the
/// Google Cloud console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// The console wraps the registration in `installed` or `web`.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).map_err(|e| AuthError::ClientSecrets(e.to_string()))?;

        file.installed.or(file.web).ok_or_else(|| {
            AuthError::ClientSecrets("expected an \"installed\" or \"web\" section".into())
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ClientSecrets(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

/// Hands out calendar credentials from the token file, refreshing or running
/// the browser flow when the cached token can't be used.
pub struct GoogleCredentialProvider {
    client_secrets_file: PathBuf,
    store: TokenStore,
    callback_port: u16,
}

impl GoogleCredentialProvider {
    pub fn new(
        client_secrets_file: impl Into<PathBuf>,
        token_file: impl Into<PathBuf>,
        callback_port: u16,
    ) -> Self {
        Self {
            client_secrets_file: client_secrets_file.into(),
            store: TokenStore::new(token_file),
            callback_port,
        }
    }

    fn flow(&self) -> Result<InstalledAppFlow, AuthError> {
        let secrets = ClientSecrets::from_file(&self.client_secrets_file)?;
        Ok(InstalledAppFlow::new(
            secrets,
            vec![CALENDAR_SCOPE.to_string()],
            self.callback_port,
        ))
    }

    /// A usable token, persisted to the token file whenever it changes.
    pub async fn token(&self) -> Result<TokenSet, AuthError> {
        let cached = self.store.load()?;

        if let Some(token_set) = &cached {
            if !token_set.needs_refresh() {
                tracing::debug!("Using cached Google token");
                return Ok(token_set.clone());
            }
        }

        // Secrets are only needed from here on.
        let flow = self.flow()?;

        if let Some(refresh_token) = cached.and_then(|t| t.refresh_token) {
            tracing::info!("Refreshing Google access token");
            match flow.refresh(&refresh_token).await {
                Ok(token_set) => {
                    self.store.save(&token_set)?;
                    return Ok(token_set);
                }
                Err(e) if e.needs_reauthorization() => {
                    tracing::warn!("Token refresh failed, re-authorizing: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("Starting interactive Google authorization");
        let token_set = flow.run().await?;
        self.store.save(&token_set)?;
        Ok(token_set)
    }
}

impl CredentialProvider for GoogleCredentialProvider {
    async fn authorized_transport(&self) -> Result<AuthorizedTransport, AuthError> {
        let token_set = self.token().await?;
        AuthorizedTransport::from_access_token(&token_set.access_token)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_secrets(dir: &Path, token_uri: &str) -> PathBuf {
        let path = dir.join("credentials.json");
        let json = serde_json::json!({
            "installed": {
                "client_id": "test_client_id",
                "client_secret": "test_client_secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": token_uri,
                "redirect_uris": ["http://localhost"]
            }
        });
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    fn stored_token(expires_at: i64, refresh_token: Option<&str>) -> TokenSet {
        TokenSet {
            access_token: "cached_access".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at,
            scopes: vec![CALENDAR_SCOPE.to_string()],
        }
    }

    #[test]
    fn test_client_secrets_installed_section() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "id");
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URL);
        assert_eq!(secrets.auth_uri, GOOGLE_AUTH_URL);
    }

    #[test]
    fn test_client_secrets_web_section() {
        let secrets = ClientSecrets::from_json(
            r#"{"web": {"client_id": "web_id", "client_secret": "s", "token_uri": "https://example.com/token"}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "web_id");
        assert_eq!(secrets.token_uri, "https://example.com/token");
    }

    #[test]
    fn test_client_secrets_without_section() {
        let result = ClientSecrets::from_json(r#"{"client_id": "id"}"#);
        assert!(matches!(result, Err(AuthError::ClientSecrets(_))));
    }

    #[tokio::test]
    async fn test_fresh_cached_token_needs_no_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token.json");
        let now = chrono::Utc::now().timestamp();
        TokenStore::new(&token_file)
            .save(&stored_token(now + 3600, None))
            .unwrap();

        // The secrets file does not exist; it must not be read.
        let provider =
            GoogleCredentialProvider::new(dir.path().join("missing.json"), &token_file, 8080);
        let token_set = provider.token().await.unwrap();

        assert_eq!(token_set.access_token, "cached_access");
        assert!(provider.authorized_transport().await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "refreshed_access",
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": CALENDAR_SCOPE
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let secrets = write_secrets(dir.path(), &format!("{}/token", mock_server.uri()));
        let token_file = dir.path().join("token.json");
        let now = chrono::Utc::now().timestamp();
        TokenStore::new(&token_file)
            .save(&stored_token(now - 60, Some("keep_me")))
            .unwrap();

        let provider = GoogleCredentialProvider::new(secrets, &token_file, 8080);
        let token_set = provider.token().await.unwrap();

        assert_eq!(token_set.access_token, "refreshed_access");
        assert_eq!(token_set.refresh_token.as_deref(), Some("keep_me"));

        let saved = TokenStore::new(&token_file).load().unwrap().unwrap();
        assert_eq!(saved.access_token, "refreshed_access");
        assert_eq!(saved.refresh_token.as_deref(), Some("keep_me"));
    }

    #[tokio::test]
    async fn test_expired_token_with_unreadable_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token.json");
        TokenStore::new(&token_file)
            .save(&stored_token(0, Some("refresh")))
            .unwrap();

        let provider =
            GoogleCredentialProvider::new(dir.path().join("missing.json"), &token_file, 8080);
        let result = provider.token().await;

        assert!(matches!(result, Err(AuthError::ClientSecrets(_))));
    }
}
