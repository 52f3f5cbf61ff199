use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{AccessControl, Caller};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::betslip::{toggle_selection, validate_bet_slip, BetSlip, Selection, SlipSummary};
use crate::db::models::DrawRow;
use crate::db::Store;
use crate::diagnostics::{Diagnostics, ErrorRecord, Level, LogFilter};
use crate::error::AppError;
use crate::feed::validate_feed_url;
use crate::sync::SyncService;
use crate::types::Match;

/// Header carrying the already-authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

const DEFAULT_ERROR_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub access: AccessControl,
    pub sync: Arc<SyncService>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub diagnostics: Arc<Diagnostics>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/config", get(get_config).put(put_config))
        .route("/sync", post(post_sync))
        .route("/draws/current", get(get_current_draw))
        .route("/errors", get(get_errors).delete(delete_errors))
        .route("/stats/latency", get(get_stats_latency))
        .route("/betslip/check", post(post_betslip_check))
        .route("/betslip/toggle", post(post_betslip_toggle))
        .with_state(state)
}

fn caller(headers: &HeaderMap) -> Caller {
    Caller::from_user_id(headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()))
}

// ---------------------------------------------------------------------------
// Query param / body structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ErrorsQuery {
    pub level: Option<Level>,
    pub code: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub api_url: String,
}

/// Toggle one pick. A missing `slip` starts from an empty one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSlipToggle {
    #[serde(default)]
    pub slip: Option<BetSlip>,
    pub match_id: String,
    pub selection: Selection,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sync_in_flight: bool,
    pub last_success_at_ms: Option<u64>,
    pub consecutive_failures: u64,
    pub total_syncs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub api_url: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct CurrentDrawResponse {
    pub draw: DrawRow,
    pub matches: Vec<Match>,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    let failures = h.consecutive_failures();
    Json(HealthResponse {
        status: if failures == 0 { "ok" } else { "degraded" },
        sync_in_flight: h.sync_in_flight(),
        last_success_at_ms: Some(h.last_success_at_ms()).filter(|ms| *ms > 0),
        consecutive_failures: failures,
        total_syncs: h.total_syncs(),
    })
}

async fn get_config(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<ConfigResponse>, AppError> {
    state.access.require_admin(&caller(&headers)).await?;
    let row = state.store.load_api_config().await?;
    Ok(Json(ConfigResponse {
        api_url: row.as_ref().map(|r| r.api_url.clone()),
        last_updated: row.and_then(|r| r.last_updated),
    }))
}

async fn put_config(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>, AppError> {
    state.access.require_admin(&caller(&headers)).await?;
    let url = validate_feed_url(&body.api_url)?;
    state.store.save_api_url(url.as_str()).await?;
    let row = state.store.load_api_config().await?;
    Ok(Json(ConfigResponse {
        api_url: row.as_ref().map(|r| r.api_url.clone()),
        last_updated: row.and_then(|r| r.last_updated),
    }))
}

async fn post_sync(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(_permit) = state.health.try_begin_sync() else {
        return AppError::SyncInProgress.into_response();
    };
    match state.sync.run(&caller(&headers)).await {
        Ok(report) => Json(report).into_response(),
        Err(failure) => (failure.error.status_code(), Json(failure)).into_response(),
    }
}

async fn get_current_draw(
    State(state): State<ApiState>,
) -> Result<Json<Option<CurrentDrawResponse>>, AppError> {
    let Some(draw) = state.store.latest_draw().await? else {
        return Ok(Json(None));
    };
    let matches = state
        .store
        .matches_for_draw(&draw.id)
        .await?
        .iter()
        .map(|row| row.to_match())
        .collect();
    Ok(Json(Some(CurrentDrawResponse { draw, matches })))
}

async fn get_errors(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<ErrorsQuery>,
) -> Result<Json<Vec<ErrorRecord>>, AppError> {
    state.access.require_admin(&caller(&headers)).await?;
    let filter = LogFilter {
        level: params.level,
        code: params.code,
    };
    let limit = params.limit.unwrap_or(DEFAULT_ERROR_LIMIT);
    Ok(Json(state.diagnostics.records(&filter, limit)))
}

async fn delete_errors(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    state.access.require_admin(&caller(&headers)).await?;
    state.diagnostics.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}

async fn post_betslip_check(Json(slip): Json<BetSlip>) -> Result<Json<SlipSummary>, AppError> {
    Ok(Json(validate_bet_slip(&slip)?))
}

async fn post_betslip_toggle(Json(req): Json<BetSlipToggle>) -> Result<Json<BetSlip>, AppError> {
    let mut slip = req.slip.unwrap_or_else(BetSlip::new);
    toggle_selection(&mut slip, &req.match_id, req.selection)?;
    Ok(Json(slip))
}
