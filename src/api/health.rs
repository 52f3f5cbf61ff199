//! Shared health state for the /health endpoint.
//! Updated by the sync service, read by the API. Also owns the in-flight
//! flag that keeps manual and scheduled syncs from overlapping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True while a sync pass holds the permit.
    pub sync_in_flight: AtomicBool,
    /// Unix millis of the last successful sync (0 = none).
    pub last_success_at_ms: AtomicU64,
    /// Failed syncs since the last success.
    pub consecutive_failures: AtomicU64,
    pub total_syncs: AtomicU64,
}

/// Held for the duration of one sync; clears the in-flight flag on drop.
pub struct SyncPermit<'a> {
    health: &'a HealthState,
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.health.sync_in_flight.store(false, Ordering::Release);
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// None when another sync is already running.
    pub fn try_begin_sync(&self) -> Option<SyncPermit<'_>> {
        self.sync_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncPermit { health: self })
    }

    pub fn record_success(&self, at_ms: u64) {
        self.last_success_at_ms.store(at_ms, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.total_syncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.total_syncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sync_in_flight(&self) -> bool {
        self.sync_in_flight.load(Ordering::Acquire)
    }

    pub fn last_success_at_ms(&self) -> u64 {
        self.last_success_at_ms.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn total_syncs(&self) -> u64 {
        self.total_syncs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permit_is_exclusive_and_released_on_drop() {
        let h = HealthState::new();
        let permit = h.try_begin_sync();
        assert!(permit.is_some());
        assert!(h.sync_in_flight());
        assert!(h.try_begin_sync().is_none());
        drop(permit);
        assert!(!h.sync_in_flight());
        assert!(h.try_begin_sync().is_some());
    }

    #[test]
    fn success_resets_failure_streak() {
        let h = HealthState::new();
        h.record_failure();
        h.record_failure();
        assert_eq!(h.consecutive_failures(), 2);
        h.record_success(1_700_000_000_000);
        assert_eq!(h.consecutive_failures(), 0);
        assert_eq!(h.last_success_at_ms(), 1_700_000_000_000);
        assert_eq!(h.total_syncs(), 3);
    }
}
