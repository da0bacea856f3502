//! Health probe: a Vault client can be built and authenticated.

use crate::vault::ClientFactory;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Builds a client and drops it. Metrics are not touched.
pub async fn probe(factory: &dyn ClientFactory) -> HealthStatus {
    match factory.connect().await {
        Ok(_) => HealthStatus::Healthy,
        Err(e) => {
            error!(
                error = %e,
                config_error = e.is_config_error(),
                "Error while creating Vault client"
            );
            HealthStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::refresh::fakes::{FakeFactory, FakeVault};

    #[tokio::test]
    async fn test_probe_healthy() {
        let factory = FakeFactory::new(FakeVault::default());
        assert_eq!(probe(factory.as_ref()).await, HealthStatus::Healthy);
        assert_eq!(factory.connects(), 1);
    }

    #[tokio::test]
    async fn test_probe_unhealthy() {
        let factory = FakeFactory::failing();
        assert_eq!(probe(factory.as_ref()).await, HealthStatus::Unhealthy);
    }
}
