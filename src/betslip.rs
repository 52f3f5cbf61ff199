//! Pools bet-slip rules: one to two outcome picks per match, with a cap on
//! how many matches may carry two picks ("doubles").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MAX_DOUBLE_SELECTIONS;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Selection {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

/// Match id → picked outcomes, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSlip {
    pub selections: BTreeMap<String, Vec<Selection>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipSummary {
    pub matches: usize,
    pub double_selections: usize,
    pub rows: u64,
}

impl BetSlip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn double_count(&self) -> usize {
        self.selections.values().filter(|s| s.len() == 2).count()
    }

    /// Number of coupon rows the slip expands to.
    pub fn row_count(&self) -> u64 {
        self.selections
            .values()
            .map(|s| s.len() as u64)
            .product()
    }
}

/// Remove `selection` if present, otherwise try to add it.
pub fn toggle_selection(slip: &mut BetSlip, match_id: &str, selection: Selection) -> Result<()> {
    let doubles = slip.double_count();
    let picks = slip.selections.entry(match_id.to_string()).or_default();

    if let Some(pos) = picks.iter().position(|s| *s == selection) {
        picks.remove(pos);
        if picks.is_empty() {
            slip.selections.remove(match_id);
        }
        return Ok(());
    }

    match picks.len() {
        0 => picks.push(selection),
        1 if doubles < MAX_DOUBLE_SELECTIONS => picks.push(selection),
        1 => {
            return Err(AppError::InvalidBetSlip(format!(
                "You can only make {MAX_DOUBLE_SELECTIONS} double selections"
            )))
        }
        _ => {
            return Err(AppError::InvalidBetSlip(
                "At most two selections per match".to_string(),
            ))
        }
    }
    Ok(())
}

pub fn validate_bet_slip(slip: &BetSlip) -> Result<SlipSummary> {
    if slip.selections.is_empty() {
        return Err(AppError::InvalidBetSlip("Bet slip has no selections".to_string()));
    }
    for (match_id, picks) in &slip.selections {
        if picks.is_empty() {
            return Err(AppError::InvalidBetSlip(format!("No selection for match {match_id}")));
        }
        if picks.len() > 2 {
            return Err(AppError::InvalidBetSlip(format!(
                "Too many selections for match {match_id}"
            )));
        }
        if picks.len() == 2 && picks[0] == picks[1] {
            return Err(AppError::InvalidBetSlip(format!(
                "Duplicate selection for match {match_id}"
            )));
        }
    }
    let doubles = slip.double_count();
    if doubles > MAX_DOUBLE_SELECTIONS {
        return Err(AppError::InvalidBetSlip(format!(
            "You can only make {MAX_DOUBLE_SELECTIONS} double selections"
        )));
    }
    Ok(SlipSummary {
        matches: slip.selections.len(),
        double_selections: doubles,
        rows: slip.row_count(),
    })
}
