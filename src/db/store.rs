use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::{ApiConfigRow, DrawRow, MatchRow};
use crate::error::{AppError, Result};
use crate::types::{Draw, Match};

/// Persistence gateway over SQLite.
///
/// Every method issues one statement and awaits it. Nothing here opens a
/// transaction, so a sync that fails midway keeps the rows it already wrote.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

const MATCH_COLUMNS: &str = "id, draw_id, home_team, away_team, home_team_medium_name, \
    away_team_medium_name, event_number, match_time, home_odds, draw_odds, away_odds, \
    home_form, away_form, head_to_head, match_status, match_status_id, sport_event_status, \
    created_at, updated_at";

impl Store {
    /// Open (creating if missing) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::persistence("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::persistence("connect", e))?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
        Ok(Self { pool })
    }

    /// Single-connection in-memory database, used by tests.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::persistence("connect", e))?;
        Self::from_pool(pool).await
    }

    // -----------------------------------------------------------------------
    // draws
    // -----------------------------------------------------------------------

    pub async fn find_draw_by_week(&self, week_number: i64, year: i64) -> Result<Option<DrawRow>> {
        sqlx::query_as::<_, DrawRow>(
            "SELECT id, week_number, year, draw_date, status, created_at, updated_at \
             FROM draws WHERE week_number = ? AND year = ?",
        )
        .bind(week_number)
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence("find_draw_by_week", e))
    }

    /// Most recent draw by (year, week).
    pub async fn latest_draw(&self) -> Result<Option<DrawRow>> {
        sqlx::query_as::<_, DrawRow>(
            "SELECT id, week_number, year, draw_date, status, created_at, updated_at \
             FROM draws ORDER BY year DESC, week_number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence("latest_draw", e))
    }

    #[cfg(test)]
    pub async fn count_draws(&self, week_number: i64, year: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM draws WHERE week_number = ? AND year = ?")
            .bind(week_number)
            .bind(year)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::persistence("count_draws", e))
    }

    pub async fn insert_draw(&self, draw: &Draw) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO draws (id, week_number, year, draw_date, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draw.id)
        .bind(draw.week_number)
        .bind(draw.year)
        .bind(&draw.draw_date)
        .bind(&draw.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence("insert_draw", e))?;
        Ok(())
    }

    pub async fn update_draw(&self, draw_id: &str, draw_date: &str, status: &str) -> Result<()> {
        sqlx::query("UPDATE draws SET draw_date = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(draw_date)
            .bind(status)
            .bind(Utc::now())
            .bind(draw_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::persistence("update_draw", e))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // matches
    // -----------------------------------------------------------------------

    pub async fn matches_for_draw(&self, draw_id: &str) -> Result<Vec<MatchRow>> {
        sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE draw_id = ? ORDER BY event_number, id"
        ))
        .bind(draw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::persistence("matches_for_draw", e))
    }

    /// Lookup by teams and kick-off within a draw, independent of the row id.
    pub async fn find_match_by_fixture(
        &self,
        draw_id: &str,
        home_team: &str,
        away_team: &str,
        match_time: &str,
    ) -> Result<Vec<MatchRow>> {
        sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE draw_id = ? AND home_team = ? AND away_team = ? AND match_time = ?"
        ))
        .bind(draw_id)
        .bind(home_team)
        .bind(away_team)
        .bind(match_time)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::persistence("find_match_by_fixture", e))
    }

    pub async fn insert_match(&self, draw_id: &str, m: &Match) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO matches (id, draw_id, home_team, away_team, home_team_medium_name, \
             away_team_medium_name, event_number, match_time, home_odds, draw_odds, away_odds, \
             home_form, away_form, head_to_head, match_status, match_status_id, \
             sport_event_status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&m.id)
        .bind(draw_id)
        .bind(&m.home_team)
        .bind(&m.away_team)
        .bind(&m.home_team_medium_name)
        .bind(&m.away_team_medium_name)
        .bind(m.event_number)
        .bind(&m.datetime)
        .bind(m.odds.home)
        .bind(m.odds.draw)
        .bind(m.odds.away)
        .bind(m.home_form())
        .bind(m.away_form())
        .bind(m.head_to_head())
        .bind(&m.match_status)
        .bind(m.match_status_id)
        .bind(&m.sport_event_status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence("insert_match", e))?;
        Ok(())
    }

    /// Overwrite every tracked column of an existing match.
    pub async fn update_match(&self, draw_id: &str, m: &Match) -> Result<()> {
        sqlx::query(
            "UPDATE matches SET home_team = ?, away_team = ?, home_team_medium_name = ?, \
             away_team_medium_name = ?, event_number = ?, match_time = ?, home_odds = ?, \
             draw_odds = ?, away_odds = ?, home_form = ?, away_form = ?, head_to_head = ?, \
             match_status = ?, match_status_id = ?, sport_event_status = ?, updated_at = ? \
             WHERE id = ? AND draw_id = ?",
        )
        .bind(&m.home_team)
        .bind(&m.away_team)
        .bind(&m.home_team_medium_name)
        .bind(&m.away_team_medium_name)
        .bind(m.event_number)
        .bind(&m.datetime)
        .bind(m.odds.home)
        .bind(m.odds.draw)
        .bind(m.odds.away)
        .bind(m.home_form())
        .bind(m.away_form())
        .bind(m.head_to_head())
        .bind(&m.match_status)
        .bind(m.match_status_id)
        .bind(&m.sport_event_status)
        .bind(Utc::now())
        .bind(&m.id)
        .bind(draw_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence("update_match", e))?;
        Ok(())
    }

    pub async fn set_match_status(&self, match_id: &str, status: &str) -> Result<()> {
        sqlx::query("UPDATE matches SET match_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(match_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::persistence("set_match_status", e))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // api_config
    // -----------------------------------------------------------------------

    pub async fn load_api_config(&self) -> Result<Option<ApiConfigRow>> {
        sqlx::query_as::<_, ApiConfigRow>(
            "SELECT id, api_url, last_updated FROM api_config ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence("load_api_config", e))
    }

    /// Update the single config row, or create it. The URL must already be validated.
    pub async fn save_api_url(&self, api_url: &str) -> Result<()> {
        match self.load_api_config().await? {
            Some(existing) => {
                sqlx::query("UPDATE api_config SET api_url = ?, last_updated = ? WHERE id = ?")
                    .bind(api_url)
                    .bind(Utc::now())
                    .bind(existing.id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| AppError::persistence("save_api_url", e))?;
            }
            None => {
                sqlx::query("INSERT INTO api_config (api_url) VALUES (?)")
                    .bind(api_url)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| AppError::persistence("save_api_url", e))?;
            }
        }
        Ok(())
    }

    /// Stamp the last successful sync time.
    pub async fn touch_api_config(&self) -> Result<()> {
        sqlx::query("UPDATE api_config SET last_updated = ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::persistence("touch_api_config", e))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // profiles
    // -----------------------------------------------------------------------

    pub async fn profile_role(&self, user_id: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT role FROM profiles WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::persistence("profile_role", e))
    }

    pub async fn set_profile_role(&self, user_id: &str, role: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO profiles (id, role) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET role = excluded.role",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence("set_profile_role", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Odds;

    fn draw(week: i64, year: i64) -> Draw {
        Draw {
            id: format!("draw-{week}-{year}"),
            week_number: week,
            year,
            draw_date: "2025-02-01T15:59:00+01:00".to_string(),
            status: "open".to_string(),
            matches: vec![],
        }
    }

    fn fixture(id: &str, home: &str, away: &str) -> Match {
        Match {
            id: id.to_string(),
            event_number: 1,
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_team_medium_name: Some(home.to_string()),
            away_team_medium_name: Some(away.to_string()),
            datetime: "2025-02-01T16:00:00+01:00".to_string(),
            match_status: "NotStarted".to_string(),
            match_status_id: 0,
            sport_event_status: "NotStarted".to_string(),
            odds: Odds { home: 2.0, draw: 3.0, away: 4.0 },
            statistics: None,
        }
    }

    #[tokio::test]
    async fn draw_natural_key_is_unique() {
        let store = Store::in_memory().await.unwrap();
        store.insert_draw(&draw(5, 2025)).await.unwrap();
        let mut dup = draw(5, 2025);
        dup.id = "other".to_string();
        let err = store.insert_draw(&dup).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { op: "insert_draw", .. }));
        assert_eq!(store.count_draws(5, 2025).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn match_round_trip_and_fixture_lookup() {
        let store = Store::in_memory().await.unwrap();
        store.insert_draw(&draw(5, 2025)).await.unwrap();
        let m = fixture("m1", "Arsenal", "Chelsea");
        store.insert_match("draw-5-2025", &m).await.unwrap();

        let rows = store.matches_for_draw("draw-5-2025").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].to_match(), m);

        let hits = store
            .find_match_by_fixture("draw-5-2025", "Arsenal", "Chelsea", &m.datetime)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let misses = store
            .find_match_by_fixture("draw-5-2025", "Chelsea", "Arsenal", &m.datetime)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn api_config_insert_then_update() {
        let store = Store::in_memory().await.unwrap();
        assert!(store.load_api_config().await.unwrap().is_none());

        store.save_api_url("https://feed.example/a").await.unwrap();
        let first = store.load_api_config().await.unwrap().unwrap();
        assert_eq!(first.api_url, "https://feed.example/a");
        assert!(first.last_updated.is_none());

        store.save_api_url("https://feed.example/b").await.unwrap();
        let second = store.load_api_config().await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.api_url, "https://feed.example/b");
        assert!(second.last_updated.is_some());
    }

    #[tokio::test]
    async fn profile_roles() {
        let store = Store::in_memory().await.unwrap();
        assert_eq!(store.profile_role("u1").await.unwrap(), None);
        store.set_profile_role("u1", "user").await.unwrap();
        store.set_profile_role("u1", "admin").await.unwrap();
        assert_eq!(store.profile_role("u1").await.unwrap().as_deref(), Some("admin"));
    }
}
