use std::path::Path;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sheetkey::AppState;
use sheetkey::config::{Config, StorageBackend};
use sheetkey::web;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://localhost:3000/";

/// Unsigned identity token carrying `email`.
pub fn id_token_for(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "iss": "https://accounts.google.com",
        "sub": "1234567890",
        "email": email,
        "email_verified": true,
    });
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{header}.{payload}.signature")
}

/// Config pointing the token endpoint at `server`, storing under `dir`.
pub fn config_for(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.google.client_id = CLIENT_ID.into();
    config.google.client_secret = CLIENT_SECRET.into();
    config.google.redirect_uri = REDIRECT_URI.into();
    config.google.token_url = format!("{}/token", server.uri());
    config.storage.backend = StorageBackend::File;
    config.storage.dir = dir.to_path_buf();
    config
}

/// Same as [`config_for`] but with in-memory storage.
pub fn memory_config_for(server: &MockServer) -> Config {
    let mut config = config_for(server, Path::new("unused"));
    config.storage.backend = StorageBackend::Memory;
    config
}

pub fn app(state: AppState) -> Router {
    web::build_web_router().with_state(state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Google answers `code` with the given tokens.
pub async fn mount_code_exchange(
    server: &MockServer,
    code: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    email: &str,
) {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "expires_in": 3599,
        "scope": "https://www.googleapis.com/auth/spreadsheets",
        "token_type": "Bearer",
        "id_token": id_token_for(email),
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = refresh_token.into();
    }

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}&")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Google answers a refresh of `refresh_token` with `access_token`.
pub async fn mount_refresh(server: &MockServer, refresh_token: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}&")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .mount(server)
        .await;
}

/// Any refresh attempt fails with `invalid_grant`.
pub async fn mount_refresh_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked.",
        })))
        .mount(server)
        .await;
}

/// Fails the test on drop if Google's token endpoint is called at all.
pub async fn forbid_token_calls(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
