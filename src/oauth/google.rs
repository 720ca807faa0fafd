//! Google OAuth 2.0 authorization code flow.
//!
//! # Key Characteristics
//! - Token request format: Form-encoded (standard OAuth)
//! - Client secret: Required
//! - Auth URL parameters: `access_type=offline` so a refresh token is issued
//! - State: carries the caller's client identifier verbatim
//!
//! # Endpoints
//! - Authorization: `https://accounts.google.com/o/oauth2/v2/auth`
//! - Token: `https://oauth2.googleapis.com/token`

use serde::Deserialize;
use tracing::{debug, warn};

use super::{OAuthError, TokenExchanger};
use crate::config::GoogleConfig;

/// Default authorization URL.
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default token URL.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested on every authorization.
pub const SCOPES: &[&str] = &[
    // Read/write access to spreadsheets
    "https://www.googleapis.com/auth/spreadsheets",
    // Account email, used to label the stored credential
    "https://www.googleapis.com/auth/userinfo.email",
    // Per-file Drive access for the picker
    "https://www.googleapis.com/auth/drive.file",
];

/// Configuration for the Google OAuth flow.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl GoogleOAuthConfig {
    /// Create a Google OAuth config with default endpoints.
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a Google OAuth config from the application config.
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            ..Self::new(&config.client_id, &config.client_secret, &config.redirect_uri)
        }
    }
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Build the Google authorization URL.
///
/// `state` is echoed back unmodified on the redirect to the callback, which
/// is how the client identifier survives the round trip through Google.
pub fn build_authorize_url(config: &GoogleOAuthConfig, state: &str) -> String {
    let scopes = config.scopes.join(" ");
    format!(
        "{}?access_type=offline&scope={}&state={}&response_type=code&client_id={}&redirect_uri={}",
        config.auth_url,
        urlencoding::encode(&scopes),
        urlencoding::encode(state),
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
    )
}

/// Token response from Google's token endpoint.
///
/// Refresh responses omit `id_token` and usually `refresh_token`.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Error response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for Google's token endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTokenClient {
    config: GoogleOAuthConfig,
    http_client: reqwest::Client,
}

impl GoogleTokenClient {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    /// POST a form to the token endpoint and parse the token response.
    async fn request_token(
        &self,
        form_data: &[(&str, &str)],
        operation: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(form_data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(&body) {
                warn!(
                    error = %error.error,
                    description = ?error.error_description,
                    operation,
                    "Google token request failed"
                );
                return Err(OAuthError::TokenExchangeFailure(
                    error.error_description.unwrap_or(error.error),
                ));
            }
            warn!(status = status.as_u16(), operation, "Google token request failed");
            return Err(OAuthError::TokenExchangeFailure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            OAuthError::TokenExchangeFailure(format!("Failed to parse {operation} response: {e}"))
        })
    }
}

#[async_trait::async_trait]
impl TokenExchanger for GoogleTokenClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        debug!("Exchanging authorization code for Google tokens");

        let form_data = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        let tokens = self.request_token(&form_data, "token exchange").await?;
        debug!(?tokens, "Google token exchange successful");
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        debug!("Refreshing Google access token");

        let form_data = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let tokens = self.request_token(&form_data, "refresh").await?;
        debug!("Google token refresh successful");
        Ok(tokens)
    }
}
