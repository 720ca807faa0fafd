//! HTTP surface of the broker.
//!
//! Four routes:
//! - `GET /authorize?clientId=..` - redirect to Google consent
//! - `GET /?code=..&state=..` - OAuth callback, renders the success page
//! - `POST /refreshToken` - `{ clientId }` in, `{ accessToken }` out
//! - `GET /health` - liveness and storage backend name

pub mod templates;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppError;
use crate::oauth::OAuthError;

// ---------------------------------------------------------------------------
// Template engine
// ---------------------------------------------------------------------------

/// Build a minijinja environment with all embedded templates registered.
fn template_env() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("layout.html", templates::LAYOUT)?;
    env.add_template("authorized.html", templates::AUTHORIZED)?;
    Ok(env)
}

/// Render a template by name with the given minijinja context.
fn render(template_name: &str, ctx: minijinja::Value) -> Result<Html<String>, AppError> {
    let env = template_env()?;
    let html = env.get_template(template_name)?.render(ctx)?;
    Ok(Html(html))
}

// ---------------------------------------------------------------------------
// Public router builder
// ---------------------------------------------------------------------------

/// Build the broker router. State is supplied by the caller.
pub fn build_web_router() -> Router<AppState> {
    Router::new()
        .route("/", get(oauth_callback))
        .route("/authorize", get(authorize))
        .route("/refreshToken", post(refresh_token))
        .route("/health", get(health))
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AuthorizeQuery {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

/// Send the browser to Google's consent screen.
///
/// Always a 302; axum's `Redirect` helpers only produce 303/307/308.
async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeQuery>,
) -> Result<Response, AppError> {
    let url = state.broker.authorization_url(params.client_id.as_deref())?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

// ---------------------------------------------------------------------------
// OAuth callback handler
// ---------------------------------------------------------------------------

/// Query parameters Google sends on the callback redirect.
#[derive(Debug, Deserialize)]
struct OAuthCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Handle the redirect back from Google.
///
/// Exchanges the code, stores the credential under the client identifier
/// carried in `state`, and shows the account email and access token.
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackQuery>,
) -> Result<Html<String>, AppError> {
    if let Some(error) = &params.error {
        let description = params
            .error_description
            .as_deref()
            .unwrap_or("Unknown error");
        tracing::warn!(%error, client_id = ?params.state, "OAuth callback error");
        return Err(OAuthError::TokenExchangeFailure(format!("{error} - {description}")).into());
    }

    let account = state
        .broker
        .complete_authorization(params.code.as_deref(), params.state.as_deref())
        .await?;

    render(
        "authorized.html",
        context! {
            email => &account.email,
            access_token => &account.access_token,
        },
    )
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Mint a fresh access token for a previously authorized client.
///
/// An unreadable body counts as a missing client identifier.
async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AppError> {
    let client_id = match body {
        Ok(Json(request)) => request.client_id,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable refresh request body");
            None
        }
    };

    let access_token = state
        .broker
        .refresh_access_token(client_id.as_deref())
        .await?;
    Ok(Json(RefreshResponse { access_token }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    storage: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.broker.store().name().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
