//! OAuth broker for Google accounts.
//!
//! Lets a client application obtain a long-lived Google credential for a
//! user once, then mint short-lived access tokens for it on demand.
//!
//! # Architecture
//!
//! - [`AuthBroker`] - Builds authorization URLs, completes the code exchange, refreshes access tokens
//! - [`TokenExchanger`] - Seam over the provider's token endpoint
//! - [`CredentialStore`] - Per-client persistence of `{ email, refreshToken }`
//! - [`google`] - Google endpoint client
//! - [`id_token`] - Unverified identity-token payload decoding
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetkey::oauth::AuthBroker;
//!
//! let broker = AuthBroker::from_config(&config);
//!
//! // Send the browser here
//! let url = broker.authorization_url(Some("client1"))?;
//! // ... Google redirects back with ?code=...&state=client1 ...
//! let account = broker.complete_authorization(Some(code), Some("client1")).await?;
//! // Later, from the client application
//! let access_token = broker.refresh_access_token(Some("client1")).await?;
//! ```

pub mod credential;
pub mod google;
pub mod id_token;
pub mod storage;

// Re-exports
pub use credential::{AuthorizedAccount, CredentialRecord};
pub use google::{GoogleOAuthConfig, GoogleTokenClient, TokenResponse};
pub use storage::{CredentialStorage, CredentialStore, FileCredentialStorage, MemoryCredentialStorage};

#[cfg(feature = "system-keyring")]
pub use storage::KeyringCredentialStorage;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::{Config, StorageBackend};

// =============================================================================
// OAuthError
// =============================================================================

/// Errors that can occur during the authorization and refresh flows.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// A required request parameter was absent or empty.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The provider rejected a code exchange or refresh.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailure(String),

    /// The identity token could not be decoded.
    #[error("Malformed identity token: {0}")]
    MalformedIdentityToken(String),

    /// The token response lacked the refresh token or account email.
    #[error("Invalid credential data: {0}")]
    InvalidCredentialData(String),

    /// No usable credential is stored for the client identifier.
    #[error("Invalid client ID")]
    InvalidClient,

    /// Credential storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// =============================================================================
// TokenExchanger Trait
// =============================================================================

/// Exchanges grants at the provider's token endpoint.
///
/// [`GoogleTokenClient`] is the production implementation; tests substitute
/// their own to observe calls without network access.
#[async_trait::async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Redeem a one-time authorization code.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError>;

    /// Trade a stored refresh token for a fresh access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError>;
}

// =============================================================================
// AuthBroker
// =============================================================================

/// Central broker.
///
/// Holds the immutable Google configuration, the token endpoint client and
/// the credential store. Shared across requests behind an `Arc`.
pub struct AuthBroker {
    google: GoogleOAuthConfig,
    exchanger: Arc<dyn TokenExchanger>,
    store: CredentialStore,
}

impl AuthBroker {
    pub fn new(
        google: GoogleOAuthConfig,
        exchanger: Arc<dyn TokenExchanger>,
        store: CredentialStore,
    ) -> Self {
        Self {
            google,
            exchanger,
            store,
        }
    }

    /// Create an AuthBroker talking to Google with the storage backend from config.
    pub fn from_config(config: &Config) -> Self {
        let google = GoogleOAuthConfig::from_config(&config.google);
        let exchanger = Arc::new(GoogleTokenClient::new(google.clone()));

        let backend: Arc<dyn CredentialStorage> = match config.storage.backend {
            StorageBackend::File => Arc::new(FileCredentialStorage::new(&config.storage.dir)),
            #[cfg(feature = "system-keyring")]
            StorageBackend::Keyring => Arc::new(KeyringCredentialStorage::new()),
            #[cfg(not(feature = "system-keyring"))]
            StorageBackend::Keyring => {
                tracing::warn!(
                    "Keyring storage requested but system-keyring feature not enabled, falling back to file storage"
                );
                Arc::new(FileCredentialStorage::new(&config.storage.dir))
            }
            StorageBackend::Memory => Arc::new(MemoryCredentialStorage::new()),
        };

        let store = CredentialStore::new(backend, config.storage.strict_writes);
        Self::new(google, exchanger, store)
    }

    /// Get a reference to the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    // =========================================================================
    // Flow: authorization_url
    // =========================================================================

    /// Build the Google consent URL for `client_id`.
    ///
    /// Pure: nothing is stored and the provider is not contacted. The client
    /// identifier travels through Google as the `state` parameter.
    pub fn authorization_url(&self, client_id: Option<&str>) -> Result<String, OAuthError> {
        let client_id = required(client_id, "clientId")?;
        let url = google::build_authorize_url(&self.google, client_id);
        info!(client_id, "Started OAuth flow");
        Ok(url)
    }

    // =========================================================================
    // Flow: complete_authorization
    // =========================================================================

    /// Complete an authorization by exchanging the code for tokens.
    ///
    /// Extracts the account email from the identity token, stores
    /// `{ email, refreshToken }` under `client_id` (replacing any previous
    /// record) and returns the email with the fresh access token.
    pub async fn complete_authorization(
        &self,
        code: Option<&str>,
        client_id: Option<&str>,
    ) -> Result<AuthorizedAccount, OAuthError> {
        let code = required(code, "code")?;
        let client_id = required(client_id, "state")?;

        let tokens = self.exchanger.exchange_code(code).await?;

        let email = match tokens.id_token.as_deref() {
            Some(token) => id_token::decode_unverified(token)?.email,
            None => None,
        };
        let record = CredentialRecord::new(email, tokens.refresh_token)?;

        self.save_record(client_id, &record).await?;
        info!(client_id, email = %record.email, "OAuth flow completed, credential stored");

        Ok(AuthorizedAccount {
            email: record.email,
            access_token: tokens.access_token,
        })
    }

    // =========================================================================
    // Flow: refresh_access_token
    // =========================================================================

    /// Mint a new access token from the refresh token stored for `client_id`.
    ///
    /// Fails with [`OAuthError::InvalidClient`] without contacting Google when
    /// no credential is stored. Provider rejections are not retried.
    pub async fn refresh_access_token(&self, client_id: Option<&str>) -> Result<String, OAuthError> {
        let client_id = client_id
            .filter(|id| !id.is_empty())
            .ok_or(OAuthError::InvalidClient)?;

        let Some(refresh_token) = self.stored_refresh_token(client_id).await else {
            debug!(client_id, "No stored credential for client");
            return Err(OAuthError::InvalidClient);
        };

        let tokens = self.exchanger.refresh(&refresh_token).await?;
        info!(client_id, "Access token refreshed");
        Ok(tokens.access_token)
    }

    // =========================================================================
    // Store access
    // =========================================================================

    // Backends do blocking I/O, so store calls run on the blocking pool.

    async fn save_record(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
        let store = self.store.clone();
        let owned_id = client_id.to_string();
        let record = record.clone();
        match tokio::task::spawn_blocking(move || store.save(&owned_id, &record)).await {
            Ok(result) => result,
            Err(err) if self.store.strict_writes() => Err(OAuthError::Storage(format!(
                "Credential save task failed: {err}"
            ))),
            Err(err) => {
                error!(client_id, error = %err, "Credential save task failed");
                Ok(())
            }
        }
    }

    async fn stored_refresh_token(&self, client_id: &str) -> Option<String> {
        let store = self.store.clone();
        let owned_id = client_id.to_string();
        match tokio::task::spawn_blocking(move || store.refresh_token(&owned_id)).await {
            Ok(token) => token,
            Err(err) => {
                warn!(client_id, error = %err, "Credential load task failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for AuthBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthBroker")
            .field("google", &self.google)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, OAuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(OAuthError::MissingParameter(name))
}

// =============================================================================
// Tests
// =============================================================================
