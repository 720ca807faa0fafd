use sheetkey::oauth::{AuthBroker, AuthorizedAccount, OAuthError};
use wiremock::MockServer;

use crate::common::{self, config_for};

fn read_record(dir: &std::path::Path, client_id: &str) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(dir.join(format!("{client_id}.json"))).ok()?;
    Some(serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn test_completion_persists_record_and_returns_access_token() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    let account = broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();

    assert_eq!(
        account,
        AuthorizedAccount {
            email: "a@example.com".into(),
            access_token: "at1".into(),
        }
    );
    assert_eq!(
        read_record(dir.path(), "client1"),
        Some(serde_json::json!({ "email": "a@example.com", "refreshToken": "rt1" }))
    );
}

#[tokio::test]
async fn test_reauthorization_replaces_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;
    common::mount_code_exchange(&server, "code2", "at2", Some("rt2"), "b@example.com").await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();
    broker
        .complete_authorization(Some("code2"), Some("client1"))
        .await
        .unwrap();

    assert_eq!(
        read_record(dir.path(), "client1"),
        Some(serde_json::json!({ "email": "b@example.com", "refreshToken": "rt2" }))
    );
}

#[tokio::test]
async fn test_missing_refresh_token_writes_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", None, "a@example.com").await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    let err = broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap_err();

    assert!(matches!(err, OAuthError::InvalidCredentialData(_)));
    assert!(read_record(dir.path(), "client1").is_none());
}

#[tokio::test]
async fn test_refresh_unknown_client_never_calls_google() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::forbid_token_calls(&server).await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    let err = broker
        .refresh_access_token(Some("unknown-client"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::InvalidClient));
}

#[tokio::test]
async fn test_refresh_uses_stored_token_and_returns_verbatim() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;
    common::mount_refresh(&server, "rt1", "ya29.fresh-access-token").await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();

    let access_token = broker.refresh_access_token(Some("client1")).await.unwrap();
    assert_eq!(access_token, "ya29.fresh-access-token");
}

#[tokio::test]
async fn test_refresh_survives_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;
    common::mount_refresh(&server, "rt1", "at2").await;

    let config = config_for(&server, dir.path());
    AuthBroker::from_config(&config)
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();

    let restarted = AuthBroker::from_config(&config);
    assert_eq!(
        restarted.refresh_access_token(Some("client1")).await.unwrap(),
        "at2"
    );
}

#[tokio::test]
async fn test_revoked_refresh_token_is_exchange_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;
    common::mount_refresh_rejected(&server).await;

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();

    let err = broker
        .refresh_access_token(Some("client1"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::TokenExchangeFailure(_)));
}

#[tokio::test]
async fn test_corrupt_record_reads_as_unknown_client() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::forbid_token_calls(&server).await;
    std::fs::write(dir.path().join("client1.json"), "{\"userToken\":").unwrap();

    let broker = AuthBroker::from_config(&config_for(&server, dir.path()));
    let err = broker
        .refresh_access_token(Some("client1"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::InvalidClient));
}

#[tokio::test]
async fn test_storage_failure_is_swallowed_by_default() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;

    // A regular file where the storage directory should be.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let broker = AuthBroker::from_config(&config_for(&server, &blocker));
    let account = broker
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap();
    assert_eq!(account.access_token, "at1");

    let err = broker
        .refresh_access_token(Some("client1"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::InvalidClient));
}

#[tokio::test]
async fn test_storage_failure_surfaces_with_strict_writes() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;

    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let mut config = config_for(&server, &blocker);
    config.storage.strict_writes = true;

    let err = AuthBroker::from_config(&config)
        .complete_authorization(Some("code1"), Some("client1"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::Storage(_)));
}

#[tokio::test]
async fn test_path_like_client_id_is_not_written_outside_storage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    common::mount_code_exchange(&server, "code1", "at1", Some("rt1"), "a@example.com").await;

    let storage = dir.path().join("refreshTokens");
    let mut config = config_for(&server, &storage);
    config.storage.strict_writes = true;

    let err = AuthBroker::from_config(&config)
        .complete_authorization(Some("code1"), Some("../escaped"))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::Storage(_)));
    assert!(!dir.path().join("escaped.json").exists());
}
