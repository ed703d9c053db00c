//! OAuth2 token endpoint client for the mail provider.
//!
//! Covers the two grants this service needs: exchanging an authorization code
//! (with its PKCE verifier) for a refresh credential, and refreshing an access
//! credential.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::{MailboxError, Result};
use crate::sanitize::truncate_for_log;

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds of the access token.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// The refresh token (only present on code exchange, and not always then).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Space-separated list of granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Grants tokens from the mail provider's authorization server.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Exchanges an authorization code and PKCE verifier for tokens.
    async fn exchange_code(
        &self,
        auth_code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse>;

    /// Obtains a fresh access token from a refresh token.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse>;
}

/// Creates an HTTP client with appropriate timeouts.
pub(crate) fn create_http_client() -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

/// Google OAuth2 token endpoint client.
pub struct GoogleOAuth {
    client: Client,
    token_url: String,
    client_id: Option<SecretString>,
    client_secret: Option<SecretString>,
}

impl GoogleOAuth {
    /// Creates a client for Google's token endpoint.
    ///
    /// Missing credentials are reported when a grant is attempted, so the
    /// rest of the service keeps working without them.
    pub fn new(client_id: Option<SecretString>, client_secret: Option<SecretString>) -> Result<Self> {
        Self::with_token_url(GOOGLE_TOKEN_URL.to_string(), client_id, client_secret)
    }

    /// Creates a client for a custom token endpoint.
    pub fn with_token_url(
        token_url: String,
        client_id: Option<SecretString>,
        client_secret: Option<SecretString>,
    ) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            token_url,
            client_id,
            client_secret,
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    fn client_id(&self) -> Result<&str> {
        self.client_id
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or_else(|| MailboxError::NotConfigured("GOOGLE_CLIENT_ID is not set".to_string()))
    }

    async fn request_token(&self, params: &[(&str, &str)], action: &str) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| MailboxError::OAuth2(format!("{} failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::OAuth2(describe_error(action, status.as_u16(), &body)));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| MailboxError::OAuth2(format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuth {
    async fn exchange_code(
        &self,
        auth_code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse> {
        info!("Exchanging authorization code");

        let client_id = self.client_id()?;
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", auth_code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
            ("client_id", client_id),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.expose_secret()));
        }

        let token = self.request_token(&params, "Code exchange").await?;
        if token.refresh_token.as_deref().unwrap_or_default().is_empty() {
            return Err(MailboxError::OAuth2(
                "Code exchange returned no refresh token".to_string(),
            ));
        }

        info!("Authorization code exchanged");
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse> {
        debug!("Refreshing access token");

        let client_id = self.client_id()?;
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", client_id),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.expose_secret()));
        }

        self.request_token(&params, "Token refresh").await
    }
}

/// Builds a log-safe description of a failed token request.
fn describe_error(action: &str, status: u16, body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => format!(
            "{} failed ({}): {} {}",
            action,
            status,
            err.error,
            err.error_description.unwrap_or_default()
        )
        .trim_end()
        .to_string(),
        Err(_) => format!("{} failed ({}): {}", action, status, truncate_for_log(body)),
    }
}
