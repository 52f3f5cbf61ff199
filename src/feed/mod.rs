//! Odds-feed ingestion: fetch, structural validation, normalization.
//!
//! The feed is inspected as a `serde_json::Value`. The helpers below read the
//! per-event fields the same way for the validator and the normalizer, so a
//! payload that validates normalizes to the same ids and team names.

pub mod fetcher;
pub mod normalizer;
pub mod validator;

use serde_json::Value;

use crate::config::SHORT_NAME_LEN;
use crate::ident::RawMatchId;
use crate::types::MatchStatistics;

pub use fetcher::{validate_feed_url, FeedClient};
pub use normalizer::normalize;
pub use validator::validate;

/// The only draw the feed is expected to describe.
pub(crate) fn first_draw(feed: &Value) -> Option<&Value> {
    feed.get("draws")?.as_array()?.first()
}

/// Nested `match.matchId`, else the event's top-level `id`.
pub(crate) fn resolve_raw_id(event: &Value) -> Option<RawMatchId> {
    event
        .get("match")
        .and_then(|m| m.get("matchId"))
        .and_then(RawMatchId::from_json)
        .or_else(|| event.get("id").and_then(RawMatchId::from_json))
}

/// Split `"Home - Away"` on the first separator. Both sides must be non-empty.
pub(crate) fn split_teams(description: &str) -> Option<(String, String)> {
    let (home, away) = description.split_once(" - ")?;
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home.to_string(), away.to_string()))
}

pub(crate) fn event_teams(event: &Value) -> Option<(String, String)> {
    event
        .get("eventDescription")
        .and_then(Value::as_str)
        .and_then(split_teams)
}

/// Which odds keys to read for one outcome. The feed uses either spelling.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub(crate) const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    fn keys(self) -> (&'static str, &'static str) {
        match self {
            Outcome::Home => ("one", "home"),
            Outcome::Draw => ("x", "draw"),
            Outcome::Away => ("two", "away"),
        }
    }
}

/// Parse one odds value. Absent or empty fields count as `0`.
///
/// `None` means the field is present but not numeric.
pub(crate) fn parse_odds(event: &Value, outcome: Outcome) -> Option<f64> {
    let (primary, alternate) = outcome.keys();
    let odds = event.get("odds");
    let field = [primary, alternate]
        .into_iter()
        .filter_map(|k| odds.and_then(|o| o.get(k)))
        .find(|v| !is_blank(v));

    match field {
        None => Some(0.0),
        Some(v) => match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        },
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// `None` when the event has no statistics block; missing sub-fields become `""`.
pub(crate) fn event_statistics(event: &Value) -> Option<MatchStatistics> {
    let stats = event.get("statistics").filter(|s| !s.is_null())?;
    let field = |k: &str| {
        stats
            .get(k)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(MatchStatistics {
        home_form: field("homeForm"),
        away_form: field("awayForm"),
        head_to_head: field("headToHead"),
    })
}

/// First `SHORT_NAME_LEN` characters, no word-boundary handling.
pub(crate) fn short_name(team: &str) -> String {
    team.chars().take(SHORT_NAME_LEN).collect()
}
