//! Access to the Vault secrets backend.
//!
//! [`VaultClientFactory`] builds an authenticated [`VaultClient`] from the
//! first available credential source, in priority order:
//!
//! 1. a static token (`VAULT_TOKEN`)
//! 2. the user token file written by `vault login` (`~/.vault-token`)
//! 3. the Kubernetes service account token, exchanged through the
//!    Kubernetes auth method
//!
//! The refresh job and the health probe only see the [`ClientFactory`] and
//! [`SecretsBackend`] traits, so both can be exercised without a Vault server.

pub mod auth;
pub mod client;

pub use client::{SecretsEngine, VaultClient};

use crate::config::{CredentialPaths, VaultSettings};
use crate::error::VaultError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only view of the Vault API used by the refresh job.
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    /// Lists every mounted secrets engine.
    ///
    /// Fails with [`VaultError::MissingData`] when the response has no `data` field.
    async fn list_mounted_secrets_engines(&self) -> Result<Vec<SecretsEngine>, VaultError>;

    /// Lists the issuer ids of the PKI engine mounted at `mount`.
    async fn list_issuers(&self, mount: &str) -> Result<Vec<String>, VaultError>;

    /// Reads the PEM certificate of an issuer, `None` if the details carry no certificate.
    async fn read_issuer_certificate(
        &self,
        mount: &str,
        issuer: &str,
    ) -> Result<Option<String>, VaultError>;
}

/// Produces a fresh, authenticated backend handle per call.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SecretsBackend>, VaultError>;
}

/// Where the credentials for a new client come from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    StaticToken(String),
    UserTokenFile(PathBuf),
    ServiceAccountToken(PathBuf),
}

impl CredentialSource {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialSource::StaticToken(_) => "static_token",
            CredentialSource::UserTokenFile(_) => "user_token_file",
            CredentialSource::ServiceAccountToken(_) => "service_account_token",
        }
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::StaticToken(_) => f.write_str("StaticToken([redacted])"),
            CredentialSource::UserTokenFile(path) => {
                f.debug_tuple("UserTokenFile").field(path).finish()
            }
            CredentialSource::ServiceAccountToken(path) => {
                f.debug_tuple("ServiceAccountToken").field(path).finish()
            }
        }
    }
}

/// Builds authenticated Vault clients from the process settings.
#[derive(Debug, Clone)]
pub struct VaultClientFactory {
    settings: VaultSettings,
    paths: CredentialPaths,
    http: reqwest::Client,
}

impl VaultClientFactory {
    pub fn new(settings: VaultSettings, paths: CredentialPaths) -> Result<Self, VaultError> {
        Ok(VaultClientFactory {
            settings,
            paths,
            http: client::http_client()?,
        })
    }

    /// Picks the credential source without touching the network.
    ///
    /// A static token wins without looking at the filesystem.
    pub fn credential_source(&self) -> Result<CredentialSource, VaultError> {
        if let Some(token) = &self.settings.token {
            return Ok(CredentialSource::StaticToken(token.clone()));
        }
        if self.paths.user_token.is_file() {
            return Ok(CredentialSource::UserTokenFile(self.paths.user_token.clone()));
        }
        if self.paths.service_account_token.is_file() {
            return Ok(CredentialSource::ServiceAccountToken(
                self.paths.service_account_token.clone(),
            ));
        }
        Err(VaultError::NoCredentials {
            user_token: self.paths.user_token.display().to_string(),
            service_account_token: self.paths.service_account_token.display().to_string(),
        })
    }

    /// Builds a client and confirms Vault accepts its token.
    pub async fn create_client(&self) -> Result<VaultClient, VaultError> {
        let source = self.credential_source()?;
        let address = self
            .settings
            .address
            .clone()
            .ok_or_else(|| VaultError::InvalidConfig {
                field: "vault_addr".to_string(),
                reason: "VAULT_ADDR is not set".to_string(),
            })?;

        let token = match &source {
            CredentialSource::StaticToken(token) => token.clone(),
            CredentialSource::UserTokenFile(path) => read_token_file(path).await?,
            CredentialSource::ServiceAccountToken(path) => {
                let jwt = read_token_file(path).await?;
                let role =
                    self.settings
                        .role
                        .as_deref()
                        .ok_or_else(|| VaultError::InvalidConfig {
                            field: "vault_role".to_string(),
                            reason: "VAULT_ROLE is required for service account login"
                                .to_string(),
                        })?;
                auth::kubernetes_login(&self.http, &address, &self.settings.auth_mount, role, &jwt)
                    .await?
            }
        };

        let client = VaultClient::new(self.http.clone(), address, token);
        client.lookup_self().await?;
        debug!(source = source.kind(), address = %client.address(), "vault client authenticated");
        Ok(client)
    }
}

#[async_trait]
impl ClientFactory for VaultClientFactory {
    async fn connect(&self) -> Result<Box<dyn SecretsBackend>, VaultError> {
        Ok(Box::new(self.create_client().await?))
    }
}

/// Reads a token file as-is, minus the line terminator editors and
/// `vault login` leave behind, which is not valid in a header value.
async fn read_token_file(path: &Path) -> Result<String, VaultError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| VaultError::TokenFile {
            path: path.display().to_string(),
            source,
        })?;
    Ok(content.trim_end_matches(&['\r', '\n'][..]).to_string())
}
