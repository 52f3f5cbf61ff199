mod access;
mod api;
mod betslip;
mod config;
mod db;
mod diagnostics;
mod error;
mod feed;
mod ident;
mod retry;
mod sync;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::access::{AccessControl, ADMIN_ROLE};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::Store;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::feed::{validate_feed_url, FeedClient};
use crate::retry::RetryPolicy;
use crate::sync::{SyncScheduler, SyncService};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = Store::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    seed(&cfg, &store).await?;

    // --- Shared state ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let diagnostics = Arc::new(Diagnostics::new());

    let feed = FeedClient::new(Duration::from_secs(cfg.http_timeout_secs))?;
    let sync = Arc::new(SyncService::new(
        store.clone(),
        feed,
        RetryPolicy::from(cfg.retry),
        Arc::clone(&diagnostics),
        Arc::clone(&latency),
        Arc::clone(&health),
    ));

    // Periodic sync (background, every SYNC_INTERVAL_SECS)
    if cfg.sync_interval_secs > 0 {
        let scheduler = SyncScheduler::new(
            Arc::clone(&sync),
            Arc::clone(&health),
            Duration::from_secs(cfg.sync_interval_secs),
        );
        tokio::spawn(async move { scheduler.run().await });
    } else {
        info!("SYNC_INTERVAL_SECS not set: syncs run only via POST /sync");
    }

    // HTTP API server
    let api_state = ApiState {
        access: AccessControl::new(store.clone()),
        store,
        sync,
        health,
        latency,
        diagnostics,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Apply FEED_URL and ADMIN_USER_IDS from the environment.
async fn seed(cfg: &Config, store: &Store) -> Result<()> {
    if let Some(raw) = &cfg.feed_url {
        match store.load_api_config().await? {
            Some(existing) if !existing.api_url.is_empty() => {
                info!(api_url = %existing.api_url, "Feed URL already configured, FEED_URL ignored");
            }
            _ => {
                let url = validate_feed_url(raw)?;
                store.save_api_url(url.as_str()).await?;
                info!(api_url = %url, "Feed URL seeded from FEED_URL");
            }
        }
    }

    for id in &cfg.admin_user_ids {
        store.set_profile_role(id, ADMIN_ROLE).await?;
    }
    if cfg.admin_user_ids.is_empty() {
        warn!("ADMIN_USER_IDS not set: admin endpoints need a profile with role 'admin'");
    } else {
        info!(count = cfg.admin_user_ids.len(), "Admin profiles ensured");
    }
    Ok(())
}
