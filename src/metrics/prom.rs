use prometheus::{GaugeVec, Opts, Registry, TextEncoder};

/// Name of the exported gauge.
pub const ISSUER_VALIDITY_METRIC: &str = "vault_issuer_validity_seconds";
const ISSUER_LABELS: [&str; 3] = ["engine", "issuer", "url"];

/// Prometheus registry holding the issuer validity gauge.
///
/// Created once at startup. Clones share the same underlying registry.
#[derive(Clone, Debug)]
pub struct IssuerMetrics {
    registry: Registry,
    issuer_validity: GaugeVec,
}

impl IssuerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let issuer_validity = GaugeVec::new(
            Opts::new(ISSUER_VALIDITY_METRIC, "Issuer expires in seconds"),
            &ISSUER_LABELS,
        )?;
        registry.register(Box::new(issuer_validity.clone()))?;

        Ok(IssuerMetrics {
            registry,
            issuer_validity,
        })
    }

    /// Adds `process_*` metrics for the running exporter.
    #[cfg(target_os = "linux")]
    pub fn register_process_collector(&self) -> Result<(), prometheus::Error> {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        self.registry.register(Box::new(collector))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn register_process_collector(&self) -> Result<(), prometheus::Error> {
        Ok(())
    }

    /// Sets the sample for one issuer, replacing any previous value.
    pub fn set_issuer_validity(&self, engine: &str, issuer: &str, url: &str, seconds: f64) {
        self.issuer_validity
            .with_label_values(&[engine, issuer, url])
            .set(seconds);
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
