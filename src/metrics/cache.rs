//! Time-bounded cache in front of the refresh job.

use super::refresh::MetricsRefresher;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Scrape {
    taken_at: Instant,
    body: String,
}

/// Serves the last exposition until it is older than the TTL.
///
/// Refreshing, reading the registry and swapping the cached body all happen
/// under one lock, so scrapes racing past expiry share a single refresh.
pub struct MetricsCache {
    refresher: MetricsRefresher,
    ttl: Duration,
    last: Mutex<Option<Scrape>>,
}

impl MetricsCache {
    pub fn new(refresher: MetricsRefresher, ttl: Duration) -> Self {
        MetricsCache {
            refresher,
            ttl,
            last: Mutex::new(None),
        }
    }

    /// Returns the exposition text, refreshing it first if the cached copy expired.
    pub async fn scrape(&self) -> Result<String, prometheus::Error> {
        let mut last = self.last.lock().await;

        if let Some(scrape) = last.as_ref() {
            if scrape.taken_at.elapsed() < self.ttl {
                return Ok(scrape.body.clone());
            }
        }

        let report = self.refresher.refresh().await;
        debug!(
            completed = report.completed,
            samples = report.samples,
            skipped_engines = report.skipped_engines,
            skipped_issuers = report.skipped_issuers,
            "metrics refreshed"
        );

        let body = self.refresher.metrics().encode()?;
        *last = Some(Scrape {
            taken_at: Instant::now(),
            body: body.clone(),
        });
        Ok(body)
    }
}
