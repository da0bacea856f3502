//! Prometheus exporter for the remaining validity of Vault PKI issuers.
//!
//! On every scrape (bounded by [`metrics::MetricsCache`]) the exporter logs
//! into Vault, lists the mounted `pki` secrets engines, reads the
//! certificate of every issuer and publishes the seconds left until it
//! expires as `vault_issuer_validity_seconds{engine, issuer, url}`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vault_pki_exporter::config::{Config, CredentialPaths};
//! use vault_pki_exporter::metrics::{IssuerMetrics, MetricsCache, MetricsRefresher};
//! use vault_pki_exporter::server::{self, AppState};
//! use vault_pki_exporter::vault::VaultClientFactory;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Config::defaults().resolve()?;
//! let factory = Arc::new(VaultClientFactory::new(
//!     settings.vault.clone(),
//!     CredentialPaths::default(),
//! )?);
//! let refresher = MetricsRefresher::new(
//!     factory.clone(),
//!     IssuerMetrics::new()?,
//!     settings.vault.address_label(),
//! );
//! let cache = Arc::new(MetricsCache::new(refresher, settings.metric_update_interval));
//! let listener = tokio::net::TcpListener::bind(settings.listen).await?;
//! server::serve(listener, server::router(AppState { factory, cache })).await?;
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod vault;

pub use certificate::remaining_validity_seconds;
pub use error::{CertificateError, VaultError};
