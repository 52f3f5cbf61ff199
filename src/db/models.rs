//! Database row types matching migrations/0001_init.sql.
//! Used by sqlx for typed queries.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Match, MatchStatistics, Odds};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DrawRow {
    pub id: String,
    pub week_number: i64,
    pub year: i64,
    pub draw_date: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MatchRow {
    pub id: String,
    pub draw_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_team_medium_name: Option<String>,
    pub away_team_medium_name: Option<String>,
    pub event_number: i64,
    pub match_time: String,
    pub home_odds: f64,
    pub draw_odds: f64,
    pub away_odds: f64,
    pub home_form: Option<String>,
    pub away_form: Option<String>,
    pub head_to_head: Option<String>,
    pub match_status: String,
    pub match_status_id: i64,
    pub sport_event_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRow {
    /// Field-by-field comparison against a freshly normalized match.
    /// Columns not listed here are never diffed.
    pub fn differs_from(&self, m: &Match) -> bool {
        self.home_team != m.home_team
            || self.away_team != m.away_team
            || self.home_team_medium_name != m.home_team_medium_name
            || self.away_team_medium_name != m.away_team_medium_name
            || self.event_number != m.event_number
            || self.match_time != m.datetime
            || self.home_odds != m.odds.home
            || self.draw_odds != m.odds.draw
            || self.away_odds != m.odds.away
            || self.home_form.as_deref() != m.home_form()
            || self.away_form.as_deref() != m.away_form()
            || self.head_to_head.as_deref() != m.head_to_head()
            || self.match_status != m.match_status
            || self.match_status_id != m.match_status_id
            || self.sport_event_status != m.sport_event_status
    }

    /// Finished and cancelled fixtures are left alone when they vanish from the feed.
    pub fn is_settled(&self) -> bool {
        self.match_status.eq_ignore_ascii_case("finished")
            || self.match_status.eq_ignore_ascii_case("cancelled")
    }

    pub fn to_match(&self) -> Match {
        let statistics = match (&self.home_form, &self.away_form, &self.head_to_head) {
            (None, None, None) => None,
            (h, a, hh) => Some(MatchStatistics {
                home_form: h.clone().unwrap_or_default(),
                away_form: a.clone().unwrap_or_default(),
                head_to_head: hh.clone().unwrap_or_default(),
            }),
        };
        Match {
            id: self.id.clone(),
            event_number: self.event_number,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            home_team_medium_name: self.home_team_medium_name.clone(),
            away_team_medium_name: self.away_team_medium_name.clone(),
            datetime: self.match_time.clone(),
            match_status: self.match_status.clone(),
            match_status_id: self.match_status_id,
            sport_event_status: self.sport_event_status.clone(),
            odds: Odds {
                home: self.home_odds,
                draw: self.draw_odds,
                away: self.away_odds,
            },
            statistics,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ApiConfigRow {
    pub id: i64,
    pub api_url: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_for(m: &Match) -> MatchRow {
        let now = Utc::now();
        MatchRow {
            id: m.id.clone(),
            draw_id: "d1".to_string(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            home_team_medium_name: m.home_team_medium_name.clone(),
            away_team_medium_name: m.away_team_medium_name.clone(),
            event_number: m.event_number,
            match_time: m.datetime.clone(),
            home_odds: m.odds.home,
            draw_odds: m.odds.draw,
            away_odds: m.odds.away,
            home_form: m.home_form().map(str::to_string),
            away_form: m.away_form().map(str::to_string),
            head_to_head: m.head_to_head().map(str::to_string),
            match_status: m.match_status.clone(),
            match_status_id: m.match_status_id,
            sport_event_status: m.sport_event_status.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Match {
        Match {
            id: "00000000-0042-4000-002a-000000051336".to_string(),
            event_number: 1,
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_team_medium_name: Some("Arsenal".to_string()),
            away_team_medium_name: Some("Chelsea".to_string()),
            datetime: "2025-02-01T16:00:00+01:00".to_string(),
            match_status: "NotStarted".to_string(),
            match_status_id: 0,
            sport_event_status: "NotStarted".to_string(),
            odds: Odds { home: 1.85, draw: 3.4, away: 4.1 },
            statistics: None,
        }
    }

    #[test]
    fn identical_match_does_not_differ() {
        let m = sample();
        assert!(!row_for(&m).differs_from(&m));
        assert_eq!(row_for(&m).to_match(), m);
    }

    #[test]
    fn odds_change_is_detected() {
        let m = sample();
        let row = row_for(&m);
        let mut changed = m.clone();
        changed.odds.draw = 3.5;
        assert!(row.differs_from(&changed));
    }

    #[test]
    fn statistics_appearing_is_detected() {
        let m = sample();
        let row = row_for(&m);
        let mut changed = m.clone();
        changed.statistics = Some(MatchStatistics {
            home_form: String::new(),
            away_form: String::new(),
            head_to_head: String::new(),
        });
        assert!(row.differs_from(&changed));
    }

    #[test]
    fn settled_check_ignores_case() {
        let mut row = row_for(&sample());
        row.match_status = "FINISHED".to_string();
        assert!(row.is_settled());
        row.match_status = "cancelled".to_string();
        assert!(row.is_settled());
        row.match_status = "Ongoing".to_string();
        assert!(!row.is_settled());
    }
}
