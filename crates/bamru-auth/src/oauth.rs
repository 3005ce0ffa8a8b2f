//! Installed-application OAuth2 flow (browser + localhost callback).

use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use warp::Filter;

use crate::error::AuthError;
use crate::google::ClientSecrets;
use crate::storage::TokenSet;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

const CALLBACK_PAGE: &str = "<html><body><h1>Authorization complete</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// An authorization URL together with the values needed to redeem its code.
pub struct PendingAuthorization {
    pub url: String,
    csrf_token: CsrfToken,
    pkce_verifier: PkceCodeVerifier,
}

impl PendingAuthorization {
    pub fn state(&self) -> &str {
        self.csrf_token.secret()
    }
}

/// OAuth2 authorization-code flow for a desktop ("installed") client.
pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    port: u16,
}

impl InstalledAppFlow {
    pub fn new(secrets: ClientSecrets, scopes: Vec<String>, port: u16) -> Self {
        Self {
            secrets,
            scopes,
            port,
        }
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    fn client(&self) -> Result<BasicClient, AuthError> {
        let auth_url = AuthUrl::new(self.secrets.auth_uri.clone())
            .map_err(|e| AuthError::ClientSecrets(format!("Invalid auth_uri: {}", e)))?;
        let token_url = TokenUrl::new(self.secrets.token_uri.clone())
            .map_err(|e| AuthError::ClientSecrets(format!("Invalid token_uri: {}", e)))?;
        let redirect_url = RedirectUrl::new(self.redirect_uri())
            .map_err(|e| AuthError::OAuthFailed(format!("Invalid redirect URI: {}", e)))?;

        Ok(BasicClient::new(
            ClientId::new(self.secrets.client_id.clone()),
            Some(ClientSecret::new(self.secrets.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody)
        .set_redirect_uri(redirect_url))
    }

    /// Build the URL the user has to visit.
    pub fn authorize(&self) -> Result<PendingAuthorization, AuthError> {
        let client = self.client()?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        // offline + consent makes Google hand out a refresh token
        let (url, csrf_token) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(PendingAuthorization {
            url: url.to_string(),
            csrf_token,
            pkce_verifier,
        })
    }

    /// Redeem an authorization code.
    #[tracing::instrument(skip_all, level = "info")]
    pub async fn exchange_code(
        &self,
        pending: PendingAuthorization,
        code: String,
    ) -> Result<TokenSet, AuthError> {
        let response = self
            .client()?
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pending.pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                AuthError::OAuthFailed(format!("Failed to exchange authorization code: {}", e))
            })?;

        Ok(self.token_set(&response, None))
    }

    /// Trade a refresh token for a new access token.
    ///
    /// Google usually omits the refresh token from the response; the one
    /// passed in is carried over in that case.
    #[tracing::instrument(skip_all, level = "info")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        Ok(self.token_set(&response, Some(refresh_token)))
    }

    /// Full interactive flow: open the browser, wait for the redirect, and
    /// exchange the code.
    pub async fn run(&self) -> Result<TokenSet, AuthError> {
        let pending = self.authorize()?;

        let (tx, rx) = oneshot::channel();
        let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let routes = warp::get()
            .and(warp::path("callback"))
            .and(warp::path::end())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::any().map(move || tx.clone()))
            .and_then(handle_callback);

        let (_, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], self.port), async move {
                shutdown_rx.await.ok();
            })
            .map_err(|_| AuthError::PortInUse(self.port))?;
        let server = tokio::spawn(server);

        tracing::info!("Authorize calendar access by visiting: {}", pending.url);
        if let Err(e) = webbrowser::open(&pending.url) {
            tracing::warn!("Could not open a browser ({}); open the URL manually", e);
        }

        let params = rx
            .await
            .map_err(|_| AuthError::OAuthFailed("OAuth callback was never received".into()));
        let _ = shutdown_tx.send(());
        let _ = server.await;

        let code = validate_callback(&params?, pending.state())?;
        let token_set = self.exchange_code(pending, code).await?;

        tracing::info!("OAuth2 flow completed");
        Ok(token_set)
    }

    fn token_set(&self, response: &BasicTokenResponse, previous_refresh: Option<&str>) -> TokenSet {
        let expires_in = response
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let scopes = response
            .scopes()
            .map(|s| s.iter().map(|scope| scope.as_str().to_string()).collect())
            .unwrap_or_else(|| self.scopes.clone());

        TokenSet {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: chrono::Utc::now().timestamp() + expires_in,
            scopes,
        }
    }
}

async fn handle_callback(
    params: HashMap<String, String>,
    tx: CallbackSender,
) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(sender) = tx.lock().await.take() {
        let _ = sender.send(params);
    }
    Ok(warp::reply::html(CALLBACK_PAGE))
}

/// Check the redirect's query parameters and pull out the authorization code.
fn validate_callback(
    params: &HashMap<String, String>,
    expected_state: &str,
) -> Result<String, AuthError> {
    if let Some(error) = params.get("error") {
        return Err(AuthError::OAuthFailed(format!(
            "Authorization denied: {}",
            error
        )));
    }

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(AuthError::CsrfMismatch);
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| AuthError::OAuthFailed("Callback did not include a code".into()))
}
