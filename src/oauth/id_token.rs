//! Identity token payload extraction.
//!
//! Google returns an OpenID Connect `id_token` alongside the access and
//! refresh tokens. Only the payload is read here: the signature is NOT
//! verified. Trust in the claims comes from the token having been received
//! directly from Google's token endpoint over TLS, in response to a request
//! authenticated with the client secret. Do not accept identity tokens from
//! any other source through this module.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::OAuthError;

/// JOSE header of the identity token. Decoded only to reject garbage.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenHeader {
    pub alg: String,
}

/// Claims read from a Google identity token payload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the claims of a compact JWS without checking its signature.
pub fn decode_unverified(token: &str) -> Result<IdTokenClaims, OAuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(OAuthError::MalformedIdentityToken(
            "expected three dot-separated segments".into(),
        ));
    };

    let _header: IdTokenHeader = decode_segment(header, "header")?;
    decode_segment(payload, "payload")
}

fn decode_segment<T: DeserializeOwned>(segment: &str, part: &str) -> Result<T, OAuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| OAuthError::MalformedIdentityToken(format!("{part} is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| OAuthError::MalformedIdentityToken(format!("{part} is not valid JSON: {e}")))
}
