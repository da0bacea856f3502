//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::{X509Builder, X509NameBuilder};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use url::Url;
use vault_pki_exporter::config::{CredentialPaths, VaultSettings};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Self-signed PEM certificate expiring `days` from now.
pub fn certificate_valid_for_days(days: u32) -> String {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "Test Root CA")
        .unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(days).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    String::from_utf8(builder.build().to_pem().unwrap()).unwrap()
}

/// Value of the issuer sample with the given labels in a text exposition.
pub fn sample_value(text: &str, engine: &str, issuer: &str, url: &str) -> Option<f64> {
    let prefix = format!(
        "vault_issuer_validity_seconds{{engine=\"{}\",issuer=\"{}\",url=\"{}\"}} ",
        engine, issuer, url
    );
    text.lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .and_then(|value| value.trim().parse().ok())
}

pub fn sample_count(text: &str) -> usize {
    text.lines()
        .filter(|line| line.starts_with("vault_issuer_validity_seconds{"))
        .count()
}

pub fn vault_settings(server: &MockServer, token: Option<&str>) -> VaultSettings {
    VaultSettings {
        address: Some(Url::parse(&format!("{}/", server.uri())).unwrap()),
        configured_address: Some(server.uri()),
        token: token.map(str::to_string),
        role: Some("exporter".to_string()),
        auth_mount: "kubernetes".to_string(),
    }
}

/// Credential paths inside `dir`; neither file exists until written.
pub fn credential_paths(dir: &TempDir) -> CredentialPaths {
    CredentialPaths {
        user_token: dir.path().join(".vault-token"),
        service_account_token: dir.path().join("serviceaccount").join("token"),
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Accepts `token` on lookup-self.
pub async fn mock_lookup_self(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": token, "policies": ["default"]}
        })))
        .mount(server)
        .await;
}

/// A Vault with a `pki/` engine holding one issuer, a `secret/` kv engine and
/// an `old-pki/` engine whose issuer listing is an invalid path.
pub async fn mock_pki_vault(server: &MockServer, days: u32) {
    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "old-pki/": {"type": "pki"},
                "pki/": {"type": "pki"},
                "secret/": {"type": "kv"}
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/old-pki/issuers"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/issuers"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"keys": ["issuer1"]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/issuer/issuer1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"certificate": certificate_valid_for_days(days)}
        })))
        .mount(server)
        .await;
}
