//! Configuration management for the exporter.
//!
//! Settings can come from three places, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (given with --config)
//! 3. Command-line arguments and environment variables (highest priority)
//!
//! The merged [`Config`] is validated once at startup into an immutable
//! [`Settings`] value that is handed to the client factory and the refresh job.
//!
//! # Example Configuration File
//!
//! ```toml
//! vault_addr = "https://vault.example.com:8200"
//! vault_role = "pki-exporter"
//! vault_mount_point = "kubernetes"
//! metric_update_interval = 300
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Service account token mounted into Kubernetes pods.
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// File name of the token written by `vault login`, relative to the home directory.
pub const USER_TOKEN_FILE: &str = ".vault-token";

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Vault server address
    pub vault_addr: Option<String>,
    /// Role used for the Kubernetes login
    pub vault_role: Option<String>,
    /// Mount point of the Kubernetes auth method
    pub vault_mount_point: Option<String>,
    /// Static Vault token
    pub vault_token: Option<String>,
    /// Lifetime of a metrics refresh in seconds
    pub metric_update_interval: Option<u64>,
    /// Address the HTTP server binds to
    pub listen: Option<String>,
    /// Log output: json or text
    pub log_format: Option<String>,
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Connection settings for Vault.
#[derive(Clone, PartialEq)]
pub struct VaultSettings {
    /// Vault address, always ending with a slash
    pub address: Option<Url>,
    /// Vault address as configured, exported as the `url` label
    pub configured_address: Option<String>,
    pub token: Option<String>,
    pub role: Option<String>,
    pub auth_mount: String,
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address.as_ref().map(Url::as_str))
            .field("configured_address", &self.configured_address)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("role", &self.role)
            .field("auth_mount", &self.auth_mount)
            .finish()
    }
}

impl VaultSettings {
    /// Address used as the `url` label of exported samples.
    ///
    /// This is the address exactly as configured, so the label does not
    /// change with host case, default ports or a trailing slash.
    pub fn address_label(&self) -> String {
        self.configured_address.clone().unwrap_or_default()
    }
}

/// Well-known credential file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPaths {
    pub user_token: PathBuf,
    pub service_account_token: PathBuf,
}

impl Default for CredentialPaths {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        CredentialPaths {
            user_token: home.join(USER_TOKEN_FILE),
            service_account_token: PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH),
        }
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub vault: VaultSettings,
    pub metric_update_interval: Duration,
    pub listen: SocketAddr,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Creates a configuration with the service defaults.
    ///
    /// - `vault_mount_point`: "kubernetes"
    /// - `metric_update_interval`: 300
    /// - `listen`: "0.0.0.0:8080"
    /// - `log_format`: "json"
    pub fn defaults() -> Self {
        Config {
            vault_addr: None,
            vault_role: None,
            vault_mount_point: Some("kubernetes".to_string()),
            vault_token: None,
            metric_update_interval: Some(300),
            listen: Some("0.0.0.0:8080".to_string()),
            log_format: Some("json".to_string()),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, a `Some` in `other` overrides this config's value.
    pub fn merge_with(self, other: Config) -> Self {
        Config {
            vault_addr: other.vault_addr.or(self.vault_addr),
            vault_role: other.vault_role.or(self.vault_role),
            vault_mount_point: other.vault_mount_point.or(self.vault_mount_point),
            vault_token: other.vault_token.or(self.vault_token),
            metric_update_interval: other
                .metric_update_interval
                .or(self.metric_update_interval),
            listen: other.listen.or(self.listen),
            log_format: other.log_format.or(self.log_format),
        }
    }

    /// Validates the merged configuration.
    ///
    /// Empty strings count as unset. In particular an exported but empty
    /// `VAULT_TOKEN` is not a static token: the client factory falls through
    /// to the token files instead of sending an empty `X-Vault-Token`.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let configured_address = non_empty(self.vault_addr).map(|raw| raw.trim().to_string());
        let address = match &configured_address {
            Some(raw) => Some(parse_address(raw)?),
            None => None,
        };

        let listen = self
            .listen
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let listen = listen.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("invalid listen address '{}': {}", listen, e))
        })?;

        let log_format = match self.log_format.as_deref().unwrap_or("json") {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown log format '{}', expected json or text",
                    other
                )))
            }
        };

        Ok(Settings {
            vault: VaultSettings {
                address,
                configured_address,
                token: non_empty(self.vault_token),
                role: non_empty(self.vault_role),
                auth_mount: non_empty(self.vault_mount_point)
                    .unwrap_or_else(|| "kubernetes".to_string()),
            },
            metric_update_interval: Duration::from_secs(
                self.metric_update_interval.unwrap_or(300),
            ),
            listen,
            log_format,
        })
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            vault_addr: Some("https://vault.example.com:8200".to_string()),
            vault_role: Some("pki-exporter".to_string()),
            vault_token: None,
            ..Config::defaults()
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_address(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::Validation(format!("invalid vault address '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "invalid vault address '{}': expected an http(s) URL",
            raw
        )));
    }
    // Joining API paths relies on the trailing slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// Validation error (malformed address, unknown option value, etc.)
    #[error("Validation Error: {0}")]
    Validation(String),
}
