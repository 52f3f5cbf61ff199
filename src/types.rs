use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Draw
// ---------------------------------------------------------------------------

/// One weekly pools round as normalized from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    /// Fresh per normalization. Persisted only when the draw is first created.
    pub id: String,
    pub week_number: i64,
    pub year: i64,
    /// Registration close time, verbatim from the feed.
    pub draw_date: String,
    /// Lowercased feed draw state.
    pub status: String,
    /// Feed arrival order.
    pub matches: Vec<Match>,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Derived from the feed's numeric match id, stable across syncs.
    pub id: String,
    pub event_number: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_team_medium_name: Option<String>,
    pub away_team_medium_name: Option<String>,
    pub datetime: String,
    pub match_status: String,
    pub match_status_id: i64,
    pub sport_event_status: String,
    pub odds: Odds,
    /// `None` when the feed carries no statistics block at all.
    pub statistics: Option<MatchStatistics>,
}

impl Match {
    pub fn home_form(&self) -> Option<&str> {
        self.statistics.as_ref().map(|s| s.home_form.as_str())
    }

    pub fn away_form(&self) -> Option<&str> {
        self.statistics.as_ref().map(|s| s.away_form.as_str())
    }

    pub fn head_to_head(&self) -> Option<&str> {
        self.statistics.as_ref().map(|s| s.head_to_head.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub home_form: String,
    pub away_form: String,
    pub head_to_head: String,
}

// ---------------------------------------------------------------------------
// Sync results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSyncStatus {
    /// No draw existed for the (week, year) pair.
    Created,
    /// The draw was already persisted and has been reconciled.
    Exists,
}

impl std::fmt::Display for DrawSyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DrawSyncStatus::Created => "created",
            DrawSyncStatus::Exists => "exists",
        };
        write!(f, "{s}")
    }
}

/// Summary counts from one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub status: DrawSyncStatus,
    pub draw_id: String,
    pub matches_added: u32,
    pub matches_updated: u32,
    pub matches_skipped: u32,
}

impl SyncOutcome {
    /// True when the pass wrote at least one match row.
    pub fn changed_matches(&self) -> bool {
        self.matches_added > 0 || self.matches_updated > 0
    }
}
