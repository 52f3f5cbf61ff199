use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::access::{AccessControl, Caller};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::SYNC_DESTINATION;
use crate::db::Store;
use crate::diagnostics::Diagnostics;
use crate::error::{AppError, Result};
use crate::feed::{normalize, validate, validate_feed_url, FeedClient};
use crate::retry::{with_retry, RetryPolicy};
use crate::sync::reconciler::Reconciler;
use crate::types::{Draw, DrawSyncStatus, SyncOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    #[serde(flatten)]
    pub outcome: SyncOutcome,
    pub week_number: i64,
    pub year: i64,
    pub message: String,
}

impl SyncReport {
    fn new(draw: &Draw, outcome: SyncOutcome) -> Self {
        let message = match outcome.status {
            DrawSyncStatus::Created => format!(
                "Draw for week {}/{} created with {} matches",
                draw.week_number, draw.year, outcome.matches_added
            ),
            DrawSyncStatus::Exists => format!(
                "Draw for week {}/{} already exists: {} updated, {} unchanged",
                draw.week_number, draw.year, outcome.matches_updated, outcome.matches_skipped
            ),
        };
        Self {
            week_number: draw.week_number,
            year: draw.year,
            message,
            outcome,
        }
    }
}

/// What the service knew when the failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub api_url: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub authenticated: bool,
    pub admin_user: bool,
}

/// Structured record of a failed sync, returned to the trigger and kept in
/// the diagnostics log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub timestamp: DateTime<Utc>,
    pub error_code: String,
    pub message: String,
    pub source: String,
    pub destination: String,
    pub transaction_id: String,
    pub affected_records: u32,
    pub system_state: SystemState,
    #[serde(skip)]
    pub error: AppError,
}

/// Runs one fetch → validate → normalize → reconcile pass.
///
/// The service takes no lock; callers serialize triggers with
/// `HealthState::try_begin_sync`.
pub struct SyncService {
    store: Store,
    reconciler: Reconciler,
    access: AccessControl,
    feed: FeedClient,
    retry: RetryPolicy,
    diagnostics: Arc<Diagnostics>,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
}

impl SyncService {
    pub fn new(
        store: Store,
        feed: FeedClient,
        retry: RetryPolicy,
        diagnostics: Arc<Diagnostics>,
        latency: Arc<LatencyStats>,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            access: AccessControl::new(store.clone()),
            store,
            feed,
            retry,
            diagnostics,
            latency,
            health,
        }
    }

    pub async fn run(&self, caller: &Caller) -> std::result::Result<SyncReport, SyncFailure> {
        let started = Instant::now();
        let transaction_id = new_transaction_id();
        let mut state = SystemState::default();

        match self.execute(caller, &mut state).await {
            Ok(report) => {
                let elapsed = started.elapsed();
                self.latency.record(elapsed);
                self.health.record_success(now_ms());
                info!(
                    transaction_id = %transaction_id,
                    status = %report.outcome.status,
                    added = report.outcome.matches_added,
                    updated = report.outcome.matches_updated,
                    skipped = report.outcome.matches_skipped,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Sync complete: {}",
                    report.message,
                );
                Ok(report)
            }
            Err(e) => {
                self.health.record_failure();
                Err(self.failure(e, transaction_id, state))
            }
        }
    }

    async fn execute(&self, caller: &Caller, state: &mut SystemState) -> Result<SyncReport> {
        let standing = self.access.describe(caller).await?;
        state.authenticated = standing.authenticated;
        state.admin_user = standing.admin_user;
        standing.ensure_admin()?;

        let config = self.store.load_api_config().await?;
        if let Some(c) = &config {
            state.api_url = c.api_url.clone();
            state.last_sync = c.last_updated;
        }
        let api_url = config
            .map(|c| c.api_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::Config("Please configure an API URL first".to_string()))?;
        let url = validate_feed_url(&api_url)?;

        info!(url = %url, "Fetching draw feed");
        let body = with_retry(&self.retry, || self.feed.fetch(&url), AppError::is_transport).await?;

        let feed: Value = serde_json::from_str(&body).map_err(|e| {
            debug!("Feed body is not JSON: {e}");
            AppError::Transport("Invalid JSON response from API".to_string())
        })?;

        if !validate(&feed) {
            return Err(AppError::Validation(
                "Invalid API response format. Expected a draw object with matches.".to_string(),
            ));
        }

        let draw = normalize(&feed)?;
        let outcome = self.reconciler.reconcile(&draw).await?;

        if outcome.changed_matches() {
            self.store.touch_api_config().await?;
        }

        Ok(SyncReport::new(&draw, outcome))
    }

    fn failure(&self, error: AppError, transaction_id: String, state: SystemState) -> SyncFailure {
        let record = self.diagnostics.record(
            &error,
            json!({
                "context": "sync",
                "transactionId": transaction_id,
                "source": state.api_url,
            }),
        );
        error!(
            transaction_id = %transaction_id,
            code = %record.code,
            "Sync failed: {}",
            record.message,
        );
        SyncFailure {
            timestamp: record.timestamp,
            error_code: record.code,
            message: record.message,
            source: state.api_url.clone(),
            destination: SYNC_DESTINATION.to_string(),
            transaction_id,
            affected_records: 0,
            system_state: state,
            error,
        }
    }
}

/// `sync-<unix millis>-<9 alphanumerics>`
fn new_transaction_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("sync-{}-{suffix}", now_ms())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
