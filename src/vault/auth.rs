//! Kubernetes service account login.

use super::client::{check_status, endpoint};
use crate::error::VaultError;
use serde::Deserialize;
use serde_json::json;
use url::Url;

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<AuthInfo>,
}

#[derive(Deserialize)]
struct AuthInfo {
    client_token: String,
}

/// Exchanges a service account JWT for a Vault token.
///
/// Posts `{role, jwt}` to `auth/<mount_point>/login` and returns
/// `auth.client_token` from the response.
pub async fn kubernetes_login(
    http: &reqwest::Client,
    address: &Url,
    mount_point: &str,
    role: &str,
    jwt: &str,
) -> Result<String, VaultError> {
    let path = format!("auth/{}/login", mount_point.trim_matches('/'));
    let response = http
        .post(endpoint(address, &path)?)
        .json(&json!({ "role": role, "jwt": jwt }))
        .send()
        .await
        .map_err(|source| VaultError::Connection {
            address: address.to_string(),
            source,
        })?;

    // Vault answers a bad role or JWT with 400 and an unknown mount with 404.
    let response = check_status(response, &path, address)
        .await
        .map_err(|e| match e {
            VaultError::Api { reason, .. } => VaultError::Auth {
                address: address.to_string(),
                reason,
            },
            VaultError::NotFound { path } => VaultError::Auth {
                address: address.to_string(),
                reason: format!("no auth method mounted at {}", path),
            },
            other => other,
        })?;

    let body: LoginResponse = response.json().await.map_err(|source| VaultError::Decode {
        path: path.clone(),
        source,
    })?;

    body.auth
        .map(|auth| auth.client_token)
        .ok_or(VaultError::MissingData {
            path,
            field: "auth.client_token".to_string(),
        })
}
