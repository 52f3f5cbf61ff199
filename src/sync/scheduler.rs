use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use crate::access::Caller;
use crate::api::health::HealthState;
use crate::sync::pipeline::SyncService;

/// Background task that re-runs the sync on a fixed interval as the
/// system caller.
pub struct SyncScheduler {
    service: Arc<SyncService>,
    health: Arc<HealthState>,
    period: Duration,
}

impl SyncScheduler {
    pub fn new(service: Arc<SyncService>, health: Arc<HealthState>, period: Duration) -> Self {
        Self { service, health, period }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.tick().await; // skip immediate first tick

        info!(period_secs = self.period.as_secs(), "Sync scheduler started");
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One scheduled attempt. Returns false when skipped.
    async fn tick(&self) -> bool {
        let Some(_permit) = self.health.try_begin_sync() else {
            warn!("Scheduled sync skipped: another sync is in flight");
            return false;
        };
        match self.service.run(&Caller::System).await {
            Ok(report) => info!(
                added = report.outcome.matches_added,
                updated = report.outcome.matches_updated,
                "Scheduled sync: {}",
                report.message,
            ),
            Err(failure) => error!(
                transaction_id = %failure.transaction_id,
                code = %failure.error_code,
                "Scheduled sync failed: {}",
                failure.message,
            ),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::latency::LatencyStats;
    use crate::db::Store;
    use crate::diagnostics::Diagnostics;
    use crate::feed::FeedClient;
    use crate::retry::RetryPolicy;

    async fn scheduler() -> (SyncScheduler, Arc<HealthState>, Arc<Diagnostics>) {
        let store = Store::in_memory().await.unwrap();
        let health = Arc::new(HealthState::new());
        let diagnostics = Arc::new(Diagnostics::new());
        let service = SyncService::new(
            store,
            FeedClient::new(Duration::from_secs(1)).unwrap(),
            RetryPolicy::none(),
            Arc::clone(&diagnostics),
            Arc::new(LatencyStats::new()),
            Arc::clone(&health),
        );
        let s = SyncScheduler::new(Arc::new(service), Arc::clone(&health), Duration::from_secs(60));
        (s, health, diagnostics)
    }

    #[tokio::test]
    async fn skips_while_another_sync_holds_the_permit() {
        let (s, health, diagnostics) = scheduler().await;
        let permit = health.try_begin_sync();
        assert!(!s.tick().await);
        assert_eq!(diagnostics.len(), 0);
        drop(permit);

        // No feed configured, so the pass runs and fails.
        assert!(s.tick().await);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(health.consecutive_failures(), 1);
        assert!(!health.sync_in_flight());
    }
}
