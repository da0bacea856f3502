//! Refreshes the issuer validity gauge from Vault.

use super::prom::IssuerMetrics;
use crate::certificate::remaining_validity_seconds;
use crate::vault::{ClientFactory, SecretsBackend};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Engine type of the PKI secrets engine.
pub const PKI_ENGINE_TYPE: &str = "pki";

/// Outcome of one refresh cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Whether the cycle got past client creation and engine listing
    pub completed: bool,
    /// Mount paths of the PKI engines found
    pub engines: Vec<String>,
    /// Number of gauge samples set
    pub samples: usize,
    /// Engines whose issuers could not be listed
    pub skipped_engines: usize,
    /// Issuers whose certificate could not be read or parsed
    pub skipped_issuers: usize,
}

/// Walks every PKI engine and records the remaining validity of its issuers.
#[derive(Clone)]
pub struct MetricsRefresher {
    factory: Arc<dyn ClientFactory>,
    metrics: IssuerMetrics,
    url: String,
}

impl MetricsRefresher {
    /// `url` is the Vault address exported as the `url` label.
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        metrics: IssuerMetrics,
        url: impl Into<String>,
    ) -> Self {
        MetricsRefresher {
            factory,
            metrics,
            url: url.into(),
        }
    }

    pub fn metrics(&self) -> &IssuerMetrics {
        &self.metrics
    }

    /// Runs one refresh cycle.
    ///
    /// Failing to build a client or to list engines leaves every gauge as it
    /// was. A failing engine or issuer is logged and skipped.
    pub async fn refresh(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        let client = match self.factory.connect().await {
            Ok(client) => client,
            Err(e) => {
                error!(
                    error = %e,
                    config_error = e.is_config_error(),
                    "Error while creating Vault client"
                );
                return report;
            }
        };

        let engines = match client.list_mounted_secrets_engines().await {
            Ok(engines) => engines,
            Err(e) if e.is_missing_data() => {
                warn!(error = %e, "No data found in the secrets engine listing");
                return report;
            }
            Err(e) => {
                error!(error = %e, "Failed to list secrets engines");
                return report;
            }
        };

        let engines: Vec<String> = engines
            .into_iter()
            .filter(|engine| engine.engine_type == PKI_ENGINE_TYPE)
            .map(|engine| engine.path)
            .collect();
        info!(engines = ?engines, "List of PKI engines");
        report.completed = true;

        for engine in &engines {
            self.refresh_engine(client.as_ref(), engine, &mut report).await;
        }
        report.engines = engines;

        report
    }

    async fn refresh_engine(
        &self,
        client: &dyn SecretsBackend,
        engine: &str,
        report: &mut RefreshReport,
    ) {
        let issuers = match client.list_issuers(engine).await {
            Ok(issuers) => issuers,
            Err(e) if e.is_not_found() => {
                warn!(engine, "Invalid path for issuers in {}", engine);
                report.skipped_engines += 1;
                return;
            }
            Err(e) => {
                error!(engine, error = %e, "Failed to list issuers");
                report.skipped_engines += 1;
                return;
            }
        };

        for issuer in &issuers {
            let certificate = match client.read_issuer_certificate(engine, issuer).await {
                Ok(Some(certificate)) => certificate,
                Ok(None) => continue,
                Err(e) => {
                    warn!(engine, issuer = %issuer, error = %e, "Failed to read issuer");
                    report.skipped_issuers += 1;
                    continue;
                }
            };

            match remaining_validity_seconds(&certificate) {
                Ok(seconds) => {
                    self.metrics
                        .set_issuer_validity(engine, issuer, &self.url, seconds as f64);
                    report.samples += 1;
                }
                Err(e) => {
                    warn!(
                        engine,
                        issuer = %issuer,
                        error = %e,
                        "Skipping issuer with unreadable certificate"
                    );
                    report.skipped_issuers += 1;
                }
            }
        }
    }
}
