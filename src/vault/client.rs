//! Minimal read-only client for the Vault HTTP API.

use super::SecretsBackend;
use crate::error::VaultError;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

static TIMEOUT: u64 = 30;
const TOKEN_HEADER: &str = "X-Vault-Token";

/// A mounted secrets engine as reported by `sys/mounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsEngine {
    /// Mount path, including the trailing slash (e.g. `pki/`)
    pub path: String,
    /// Engine type (e.g. `pki`, `kv`)
    pub engine_type: String,
}

#[derive(Deserialize)]
struct MountsResponse {
    data: Option<BTreeMap<String, MountEntry>>,
}

#[derive(Deserialize)]
struct MountEntry {
    #[serde(rename = "type", default)]
    engine_type: String,
}

#[derive(Deserialize)]
struct ListResponse {
    data: Option<KeysData>,
}

#[derive(Deserialize)]
struct KeysData {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct IssuerResponse {
    data: Option<IssuerData>,
}

#[derive(Deserialize)]
struct IssuerData {
    certificate: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Builds the HTTP client shared by every Vault client handle.
pub fn http_client() -> Result<reqwest::Client, VaultError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT))
        .build()
        .map_err(|e| VaultError::InvalidConfig {
            field: "http_client".to_string(),
            reason: e.to_string(),
        })
}

/// An authenticated handle to Vault.
///
/// Handles are cheap and short-lived: the factory creates a new one for each
/// refresh cycle and each health check.
#[derive(Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    address: Url,
    token: String,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address.as_str())
            .field("token", &"[redacted]")
            .finish()
    }
}

impl VaultClient {
    /// Creates a handle using `token`. `address` must end with a slash.
    pub fn new(http: reqwest::Client, address: Url, token: impl Into<String>) -> Self {
        VaultClient {
            http,
            address,
            token: token.into(),
        }
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Fails unless Vault accepts the token.
    pub async fn lookup_self(&self) -> Result<(), VaultError> {
        self.get("auth/token/lookup-self", &[]).await.map(|_| ())
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, VaultError> {
        let url = endpoint(&self.address, path)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|source| VaultError::Connection {
                address: self.address.to_string(),
                source,
            })?;
        check_status(response, path, &self.address).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, VaultError> {
        self.get(path, query)
            .await?
            .json::<T>()
            .await
            .map_err(|source| VaultError::Decode {
                path: path.to_string(),
                source,
            })
    }
}

#[async_trait]
impl SecretsBackend for VaultClient {
    async fn list_mounted_secrets_engines(&self) -> Result<Vec<SecretsEngine>, VaultError> {
        let path = "sys/mounts";
        let response: MountsResponse = self.get_json(path, &[]).await?;
        let data = response.data.ok_or_else(|| VaultError::MissingData {
            path: path.to_string(),
            field: "data".to_string(),
        })?;

        Ok(data
            .into_iter()
            .map(|(path, entry)| SecretsEngine {
                path,
                engine_type: entry.engine_type,
            })
            .collect())
    }

    async fn list_issuers(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        let path = format!("{}/issuers", mount.trim_matches('/'));
        let response: ListResponse = self.get_json(&path, &[("list", "true")]).await?;
        Ok(response.data.map(|data| data.keys).unwrap_or_default())
    }

    async fn read_issuer_certificate(
        &self,
        mount: &str,
        issuer: &str,
    ) -> Result<Option<String>, VaultError> {
        let path = format!("{}/issuer/{}", mount.trim_matches('/'), issuer);
        let response: IssuerResponse = self.get_json(&path, &[]).await?;
        Ok(response.data.and_then(|data| data.certificate))
    }
}

/// Resolves an API path relative to `/v1` on `address`.
pub(crate) fn endpoint(address: &Url, path: &str) -> Result<Url, VaultError> {
    address
        .join(&format!("v1/{}", path))
        .map_err(|e| VaultError::InvalidConfig {
            field: "vault_addr".to_string(),
            reason: e.to_string(),
        })
}

/// Maps non-success responses onto [`VaultError`].
pub(crate) async fn check_status(
    response: Response,
    path: &str,
    address: &Url,
) -> Result<Response, VaultError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = match response.json::<ErrorBody>().await {
        Ok(body) if !body.errors.is_empty() => body.errors.join("; "),
        _ => status.to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(VaultError::Auth {
            address: address.to_string(),
            reason,
        }),
        StatusCode::NOT_FOUND => Err(VaultError::NotFound {
            path: path.to_string(),
        }),
        _ => Err(VaultError::Api {
            path: path.to_string(),
            status: status.as_u16(),
            reason,
        }),
    }
}
