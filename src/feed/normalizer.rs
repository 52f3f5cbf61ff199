use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DEFAULT_MATCH_STATUS;
use crate::error::{AppError, Result};
use crate::feed::{
    event_statistics, event_teams, first_draw, parse_odds, resolve_raw_id, short_name, Outcome,
};
use crate::ident::derive_match_id;
use crate::types::{Draw, Match, Odds};

fn week_pattern() -> &'static Regex {
    static WEEK: OnceLock<Regex> = OnceLock::new();
    WEEK.get_or_init(|| Regex::new(r"v (\d+)").expect("valid week pattern"))
}

/// ISO-8601 week number of a calendar date.
pub fn iso_week_of(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Parse the feed's close/start timestamps as wall-clock time in their own offset.
pub fn parse_feed_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    // `+0100` style offsets
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Week number from a close description like `"Stryktipset v 5, stänger ..."`.
pub fn week_from_description(description: &str) -> Option<i64> {
    week_pattern()
        .captures(description)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Convert a validated feed payload into a `Draw`.
///
/// Odds that do not parse become `0`. A missing match id or team name fails the
/// whole draw rather than dropping the event.
pub fn normalize(feed: &Value) -> Result<Draw> {
    let draw = first_draw(feed)
        .ok_or_else(|| AppError::Normalization("Feed contains no draw".to_string()))?;

    let draw_date = draw
        .get("regCloseTime")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Normalization("regCloseTime is required".to_string()))?
        .to_string();
    let closes_at = parse_feed_time(&draw_date).ok_or_else(|| {
        AppError::Normalization(format!("regCloseTime is not a valid timestamp: {draw_date}"))
    })?;

    let week_number = draw
        .get("regCloseDescription")
        .and_then(Value::as_str)
        .and_then(week_from_description)
        .unwrap_or_else(|| i64::from(iso_week_of(closes_at.date())));
    let year = i64::from(closes_at.year());

    let status = draw
        .get("drawState")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_lowercase();

    let events = draw
        .get("drawEvents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let matches = events
        .iter()
        .enumerate()
        .map(|(index, event)| normalize_event(index, event))
        .collect::<Result<Vec<_>>>()?;

    info!(
        week = week_number,
        year,
        status = %status,
        matches = matches.len(),
        "Normalized draw v{week_number}/{year} with {} matches",
        matches.len()
    );

    Ok(Draw {
        id: Uuid::new_v4().to_string(),
        week_number,
        year,
        draw_date,
        status,
        matches,
    })
}

fn normalize_event(index: usize, event: &Value) -> Result<Match> {
    let raw_id = resolve_raw_id(event).ok_or_else(|| {
        AppError::Normalization(format!("Match ID is required (event #{})", index + 1))
    })?;
    let id = derive_match_id(raw_id);

    let (home_team, away_team) = event_teams(event).ok_or_else(|| {
        AppError::Normalization(format!(
            "Team names are required from API (event #{}, match {raw_id})",
            index + 1
        ))
    })?;

    let event_number = event
        .get("eventNumber")
        .and_then(Value::as_i64)
        .filter(|n| *n != 0)
        .unwrap_or(index as i64 + 1);

    let details = event.get("match");
    let detail_str = |key: &str| {
        details
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    // Odds are non-negative; anything else is treated like an unparsable value.
    let [home, draw, away] = Outcome::ALL.map(|o| {
        parse_odds(event, o)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0)
    });

    debug!(raw_id = %raw_id, match_id = %id, "Mapped {home_team} - {away_team}");

    Ok(Match {
        id,
        event_number,
        home_team_medium_name: Some(short_name(&home_team)),
        away_team_medium_name: Some(short_name(&away_team)),
        home_team,
        away_team,
        datetime: detail_str("matchStart").unwrap_or_default().to_string(),
        match_status: detail_str("status").unwrap_or(DEFAULT_MATCH_STATUS).to_string(),
        match_status_id: details
            .and_then(|m| m.get("statusId"))
            .and_then(Value::as_i64)
            .unwrap_or(0),
        sport_event_status: detail_str("sportEventStatus")
            .unwrap_or(DEFAULT_MATCH_STATUS)
            .to_string(),
        odds: Odds { home, draw, away },
        statistics: event_statistics(event),
    })
}
