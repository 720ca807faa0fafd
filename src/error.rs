use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::oauth::OAuthError;

/// Application error rendered at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    r#type: String,
    code: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OAuth(err) => match err {
                OAuthError::MalformedIdentityToken(_) | OAuthError::InvalidClient => {
                    StatusCode::BAD_REQUEST
                }
                OAuthError::MissingParameter(_)
                | OAuthError::TokenExchangeFailure(_)
                | OAuthError::Http(_)
                | OAuthError::InvalidCredentialData(_)
                | OAuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::OAuth(OAuthError::MalformedIdentityToken(_) | OAuthError::InvalidClient) => {
                "invalid_request_error"
            }
            Self::OAuth(OAuthError::MissingParameter(_)) => "invalid_request_error",
            Self::OAuth(OAuthError::TokenExchangeFailure(_) | OAuthError::Http(_)) => {
                "oauth_error"
            }
            Self::OAuth(_) | Self::Internal(_) => "server_error",
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::OAuth(err) => Some(match err {
                OAuthError::MissingParameter(_) => "missing_parameter",
                OAuthError::TokenExchangeFailure(_) | OAuthError::Http(_) => {
                    "token_exchange_failure"
                }
                OAuthError::MalformedIdentityToken(_) => "malformed_identity_token",
                OAuthError::InvalidCredentialData(_) => "invalid_credential_data",
                OAuthError::InvalidClient => "invalid_client",
                OAuthError::Storage(_) => "storage_failure",
            }),
            Self::Internal(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: self.error_code().map(String::from),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("Template error: {err}"))
    }
}
