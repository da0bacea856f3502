//! Error types for the Vault PKI exporter.
//!
//! Errors are split by where they surface: [`VaultError`] for building a
//! Vault client and talking to the Vault API, [`CertificateError`] for
//! reading issuer certificates. Configuration errors live next to the
//! configuration loader in [`crate::config`].

use std::io;
use thiserror::Error;

/// Error type for Vault client construction and Vault API calls.
///
/// The client factory only ever returns the configuration variants
/// (`NoCredentials`, `InvalidConfig`, `TokenFile`) or the backend variants
/// (`Auth`, `Connection`, `Api`, `Decode`). Callers that need to tell the two
/// apart use [`VaultError::is_config_error`].
#[derive(Debug, Error)]
pub enum VaultError {
    /// No static token, user token file or service account token was found
    #[error(
        "no credential source available: VAULT_TOKEN is unset and neither {user_token} nor {service_account_token} exists"
    )]
    NoCredentials {
        /// Path checked for a user token
        user_token: String,
        /// Path checked for a service account token
        service_account_token: String,
    },

    /// Configuration required for the call is missing or invalid
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        /// Which setting was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },

    /// A credential file exists but could not be read
    #[error("failed to read token file {path}: {source}")]
    TokenFile {
        /// The token file path
        path: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// Vault rejected the token or the login exchange
    #[error("authentication against {address} failed: {reason}")]
    Auth {
        /// Vault address
        address: String,
        /// Details returned by Vault
        reason: String,
    },

    /// Vault could not be reached
    #[error("connection to {address} failed: {source}")]
    Connection {
        /// Vault address
        address: String,
        /// The underlying transport error
        source: reqwest::Error,
    },

    /// The requested path does not exist
    #[error("invalid path: {path}")]
    NotFound {
        /// API path relative to /v1
        path: String,
    },

    /// Vault answered with an unexpected status
    #[error("unexpected status {status} from {path}: {reason}")]
    Api {
        /// API path relative to /v1
        path: String,
        /// HTTP status code
        status: u16,
        /// Error messages from the response body
        reason: String,
    },

    /// The response lacks a field the caller depends on
    #[error("no '{field}' found in the response from {path}")]
    MissingData {
        /// API path relative to /v1
        path: String,
        /// Missing field
        field: String,
    },

    /// The response body is not the expected JSON document
    #[error("failed to decode the response from {path}: {source}")]
    Decode {
        /// API path relative to /v1
        path: String,
        /// The underlying transport or decoding error
        source: reqwest::Error,
    },
}

impl VaultError {
    /// Whether the error comes from local configuration rather than from Vault.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::NoCredentials { .. } | Self::InvalidConfig { .. } | Self::TokenFile { .. }
        )
    }

    /// Whether Vault reported the path as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the response lacked a field the caller depends on.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

/// Error type for certificate inspection.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Input is not a well-formed PEM encoded X.509 certificate
    #[error("invalid PEM certificate: {details}")]
    Parse {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Remaining validity could not be computed
    #[error("failed to compute certificate validity: {details}")]
    Time {
        /// The underlying OpenSSL error
        details: String,
    },
}
