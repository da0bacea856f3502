//! End-to-end tests against a mocked Vault API.

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vault_pki_exporter::config::CredentialPaths;
use vault_pki_exporter::health::{probe, HealthStatus};
use vault_pki_exporter::metrics::{IssuerMetrics, MetricsCache, MetricsRefresher};
use vault_pki_exporter::vault::{CredentialSource, VaultClientFactory};
use vault_pki_exporter::VaultError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_static_token_never_reads_token_files() {
    let server = MockServer::start().await;
    mock_lookup_self(&server, "test-token").await;

    // Token files are directories: reading them would fail.
    let dir = TempDir::new().unwrap();
    let paths = credential_paths(&dir);
    std::fs::create_dir_all(&paths.user_token).unwrap();
    std::fs::create_dir_all(&paths.service_account_token).unwrap();

    let factory =
        VaultClientFactory::new(vault_settings(&server, Some("test-token")), paths).unwrap();
    let client = factory.create_client().await.unwrap();
    assert_eq!(client.address().as_str(), format!("{}/", server.uri()));
}

#[tokio::test]
async fn test_user_token_file_used_verbatim() {
    let server = MockServer::start().await;
    mock_lookup_self(&server, "user-token-content").await;

    let dir = TempDir::new().unwrap();
    let paths = credential_paths(&dir);
    write_file(&paths.user_token, "user-token-content");

    let factory = VaultClientFactory::new(vault_settings(&server, None), paths.clone()).unwrap();
    assert_eq!(
        factory.credential_source().unwrap(),
        CredentialSource::UserTokenFile(paths.user_token.clone())
    );
    factory.create_client().await.unwrap();
}

#[tokio::test]
async fn test_service_account_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/kubernetes/login"))
        .and(body_json(json!({"role": "exporter", "jwt": "sa-jwt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": {"client_token": "s.from-login"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_lookup_self(&server, "s.from-login").await;

    let dir = TempDir::new().unwrap();
    let paths = credential_paths(&dir);
    write_file(&paths.service_account_token, "sa-jwt");

    let factory = VaultClientFactory::new(vault_settings(&server, None), paths).unwrap();
    factory.create_client().await.unwrap();
}

#[tokio::test]
async fn test_no_credentials() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let factory =
        VaultClientFactory::new(vault_settings(&server, None), credential_paths(&dir)).unwrap();
    let err = factory.create_client().await.unwrap_err();

    assert!(matches!(err, VaultError::NoCredentials { .. }));
    assert!(err.is_config_error());
    assert_eq!(probe(&factory).await, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_rejected_token_is_not_a_config_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", "revoked"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let factory = VaultClientFactory::new(
        vault_settings(&server, Some("revoked")),
        CredentialPaths::default(),
    )
    .unwrap();

    let err = factory.create_client().await.unwrap_err();
    assert!(matches!(err, VaultError::Auth { .. }));
    assert!(!err.is_config_error());
    assert_eq!(probe(&factory).await, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_health_probe_healthy() {
    let server = MockServer::start().await;
    mock_lookup_self(&server, "test-token").await;

    let factory = VaultClientFactory::new(
        vault_settings(&server, Some("test-token")),
        CredentialPaths::default(),
    )
    .unwrap();
    assert_eq!(probe(&factory).await, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_refresh_reports_pki_issuers() {
    let server = MockServer::start().await;
    mock_lookup_self(&server, "test-token").await;
    mock_pki_vault(&server, 10).await;

    let settings = vault_settings(&server, Some("test-token"));
    let url = settings.address_label();
    let factory =
        Arc::new(VaultClientFactory::new(settings, CredentialPaths::default()).unwrap());
    let refresher = MetricsRefresher::new(factory, IssuerMetrics::new().unwrap(), url.clone());

    let report = refresher.refresh().await;
    assert!(report.completed);
    assert_eq!(report.engines, vec!["old-pki/".to_string(), "pki/".to_string()]);
    assert_eq!(report.skipped_engines, 1);
    assert_eq!(report.samples, 1);

    let text = refresher.metrics().encode().unwrap();
    assert_eq!(sample_count(&text), 1);
    let value = sample_value(&text, "pki/", "issuer1", &url).unwrap();
    assert!(value > 9.0 * 86_400.0);
    assert!(value <= 10.0 * 86_400.0);
}

#[tokio::test]
async fn test_cached_scrapes_query_vault_once() {
    let server = MockServer::start().await;
    mock_lookup_self(&server, "test-token").await;
    mock_pki_vault(&server, 30).await;

    let settings = vault_settings(&server, Some("test-token"));
    let url = settings.address_label();
    let factory =
        Arc::new(VaultClientFactory::new(settings, CredentialPaths::default()).unwrap());
    let refresher = MetricsRefresher::new(factory, IssuerMetrics::new().unwrap(), url);
    let cache = MetricsCache::new(refresher, Duration::from_secs(300));

    let first = cache.scrape().await.unwrap();
    let second = cache.scrape().await.unwrap();
    assert_eq!(first, second);

    let mount_listings = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/v1/sys/mounts")
        .count();
    assert_eq!(mount_listings, 1);
}
