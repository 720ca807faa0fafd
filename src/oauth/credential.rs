//! Credential data persisted per client identifier.
//!
//! A [`CredentialRecord`] is the only durable artifact of a completed
//! authorization: the Google account email plus its refresh token. Access
//! tokens are handed back to the caller in an [`AuthorizedAccount`] and are
//! never written anywhere.
//!
//! # On-disk Format
//!
//! ```text
//! {"email":"a@example.com","refreshToken":"1//0g..."}
//! ```

use serde::{Deserialize, Serialize};

use super::OAuthError;

/// Durable credential for one client identifier.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Email address of the Google account that granted access.
    pub email: String,

    /// Long-lived refresh token issued with `access_type=offline`.
    pub refresh_token: String,
}

impl CredentialRecord {
    /// Build a record from the values extracted out of a token exchange.
    ///
    /// Both values must be present and non-empty, otherwise the exchange did
    /// not yield a usable credential and nothing may be stored.
    pub fn new(email: Option<String>, refresh_token: Option<String>) -> Result<Self, OAuthError> {
        let refresh_token = refresh_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            OAuthError::InvalidCredentialData("refresh token missing from token response".into())
        })?;
        let email = email.filter(|e| !e.is_empty()).ok_or_else(|| {
            OAuthError::InvalidCredentialData("user email missing from identity token".into())
        })?;

        Ok(Self {
            email,
            refresh_token,
        })
    }
}

// Keeps refresh tokens out of logs and panic messages.
impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("email", &self.email)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Result of a completed authorization, returned to the browser once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedAccount {
    pub email: String,
    pub access_token: String,
}
