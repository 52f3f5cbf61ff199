use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::CANCELLED_STATUS;
use crate::db::models::MatchRow;
use crate::db::Store;
use crate::error::Result;
use crate::types::{Draw, DrawSyncStatus, SyncOutcome};

/// Applies a normalized draw to the store with differential writes.
///
/// The draw's (week, year) pair is the natural key. Matches are keyed by their
/// derived id; unchanged rows are not written, which makes a repeated sync of
/// the same feed a no-op. No lock is taken: overlapping calls for the same
/// draw can interleave at the database.
pub struct Reconciler {
    store: Store,
}

impl Reconciler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, draw: &Draw) -> Result<SyncOutcome> {
        match self.store.find_draw_by_week(draw.week_number, draw.year).await? {
            None => self.create(draw).await,
            Some(existing) => self.merge(&existing.id, draw).await,
        }
    }

    /// First sighting of this (week, year): insert everything.
    async fn create(&self, draw: &Draw) -> Result<SyncOutcome> {
        self.store.insert_draw(draw).await?;

        let mut matches_added = 0u32;
        for m in &draw.matches {
            self.store.insert_match(&draw.id, m).await?;
            matches_added += 1;
        }

        info!(
            draw_id = %draw.id,
            week = draw.week_number,
            year = draw.year,
            matches_added,
            "Created draw v{}/{} with {matches_added} matches",
            draw.week_number,
            draw.year,
        );

        Ok(SyncOutcome {
            status: DrawSyncStatus::Created,
            draw_id: draw.id.clone(),
            matches_added,
            matches_updated: 0,
            matches_skipped: 0,
        })
    }

    async fn merge(&self, draw_id: &str, draw: &Draw) -> Result<SyncOutcome> {
        self.store.update_draw(draw_id, &draw.draw_date, &draw.status).await?;

        let existing: HashMap<String, MatchRow> = self
            .store
            .matches_for_draw(draw_id)
            .await?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        let mut matches_updated = 0u32;
        let mut matches_skipped = 0u32;

        for m in &draw.matches {
            match existing.get(&m.id) {
                Some(row) if row.differs_from(m) => {
                    self.store.update_match(draw_id, m).await?;
                    debug!(match_id = %m.id, "Updated {} - {}", m.home_team, m.away_team);
                    matches_updated += 1;
                }
                Some(_) => matches_skipped += 1,
                None => {
                    // Same fixture may already be stored under an older id scheme.
                    let by_fixture = self
                        .store
                        .find_match_by_fixture(draw_id, &m.home_team, &m.away_team, &m.datetime)
                        .await?;
                    if by_fixture.is_empty() {
                        self.store.insert_match(draw_id, m).await?;
                        info!(match_id = %m.id, "Inserted new match {} - {}", m.home_team, m.away_team);
                        // Inserts into an existing draw count as updates.
                        matches_updated += 1;
                    } else {
                        debug!(
                            match_id = %m.id,
                            existing_id = %by_fixture[0].id,
                            "Match already stored under another id"
                        );
                        matches_skipped += 1;
                    }
                }
            }
        }

        let seen: HashSet<&str> = draw.matches.iter().map(|m| m.id.as_str()).collect();
        for row in self.store.matches_for_draw(draw_id).await? {
            if seen.contains(row.id.as_str()) || row.is_settled() {
                continue;
            }
            self.store.set_match_status(&row.id, CANCELLED_STATUS).await?;
            info!(match_id = %row.id, "Cancelled {} - {}: no longer in feed", row.home_team, row.away_team);
            matches_skipped += 1;
        }

        info!(
            draw_id = %draw_id,
            week = draw.week_number,
            year = draw.year,
            matches_updated,
            matches_skipped,
            "Draw v{}/{} reconciled: {matches_updated} updated, {matches_skipped} skipped",
            draw.week_number,
            draw.year,
        );

        Ok(SyncOutcome {
            status: DrawSyncStatus::Exists,
            draw_id: draw_id.to_string(),
            matches_added: 0,
            matches_updated,
            matches_skipped,
        })
    }
}
