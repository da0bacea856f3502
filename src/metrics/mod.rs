//! Issuer validity metrics.
//!
//! # Submodules
//!
//! - `prom` - Prometheus registry and the issuer validity gauge
//! - `refresh` - walks Vault and updates the gauge
//! - `cache` - bounds how often a scrape triggers a refresh

pub mod cache;
pub mod prom;
pub mod refresh;

pub use cache::MetricsCache;
pub use prom::IssuerMetrics;
pub use refresh::{MetricsRefresher, RefreshReport};
