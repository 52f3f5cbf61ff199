use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::feed::{event_teams, first_draw, parse_odds, resolve_raw_id, Outcome};
use crate::ident::derive_match_id;

/// Structural check of a parsed feed payload.
///
/// Pure predicate: the reason for a rejection is logged, the caller decides
/// what error to raise. Only `draws[0]` is inspected.
pub fn validate(feed: &Value) -> bool {
    match check(feed) {
        Ok(events) => {
            debug!(events, "Feed payload passed validation");
            true
        }
        Err(reason) => {
            warn!(reason = %reason, "Invalid API response: {reason}");
            false
        }
    }
}

fn check(feed: &Value) -> std::result::Result<usize, String> {
    if !feed.is_object() {
        return Err("not an object".to_string());
    }
    let draws = feed
        .get("draws")
        .and_then(Value::as_array)
        .ok_or("draws is not an array")?;
    if draws.is_empty() {
        return Err("draws array is empty".to_string());
    }
    let draw = first_draw(feed).ok_or("draws array is empty")?;

    if !draw.get("drawNumber").is_some_and(Value::is_number) {
        return Err("drawNumber is not a number".to_string());
    }
    if !draw.get("regCloseTime").is_some_and(Value::is_string) {
        return Err("regCloseTime is not a string".to_string());
    }
    let events = draw
        .get("drawEvents")
        .and_then(Value::as_array)
        .ok_or("drawEvents is not an array")?;

    let mut seen: HashSet<String> = HashSet::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        check_event(event, &mut seen).map_err(|reason| format!("event #{}: {reason}", index + 1))?;
    }

    Ok(events.len())
}

fn check_event(event: &Value, seen: &mut HashSet<String>) -> std::result::Result<(), String> {
    if !event.is_object() {
        return Err("match is not an object".to_string());
    }

    let raw_id = resolve_raw_id(event).ok_or("no valid match ID found")?;
    let match_id = derive_match_id(raw_id);
    if !seen.insert(match_id.clone()) {
        return Err(format!("duplicate match ID {match_id} (raw {raw_id})"));
    }

    if event_teams(event).is_none() {
        return Err("eventDescription does not split into home and away teams".to_string());
    }

    let has_start = event
        .get("match")
        .and_then(|m| m.get("matchStart"))
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_start {
        return Err("no valid match time".to_string());
    }

    // Negative odds pass here; only non-numeric values are rejected.
    if Outcome::ALL.iter().any(|o| parse_odds(event, *o).is_none()) {
        return Err("odds are not numeric".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: u64, desc: &str) -> Value {
        json!({
            "eventNumber": 1,
            "eventDescription": desc,
            "match": {"matchId": id, "matchStart": "2025-02-01T16:00:00+01:00", "status": "NotStarted"},
            "odds": {"one": "1,85", "x": "3,40", "two": "4,10"}
        })
    }

    fn feed(events: Vec<Value>) -> Value {
        json!({
            "draws": [{
                "drawNumber": 4711,
                "regCloseTime": "2025-02-01T15:59:00+01:00",
                "regCloseDescription": "Stryktipset v 5, stänger 2025-02-01 15:59",
                "drawState": "Open",
                "drawEvents": events
            }]
        })
    }

    #[test]
    fn accepts_well_formed_feed() {
        let f = feed(vec![event(1, "Arsenal - Chelsea"), event(2, "Everton - Fulham")]);
        assert!(validate(&f));
    }

    #[test]
    fn rejects_non_object_and_empty_draws() {
        assert!(!validate(&json!([])));
        assert!(!validate(&json!({"draws": []})));
        assert!(!validate(&json!({"draws": "nope"})));
    }

    #[test]
    fn rejects_bad_draw_fields() {
        let mut f = feed(vec![event(1, "Arsenal - Chelsea")]);
        f["draws"][0]["drawNumber"] = json!("4711");
        assert!(!validate(&f));

        let mut f = feed(vec![event(1, "Arsenal - Chelsea")]);
        f["draws"][0]["regCloseTime"] = json!(12345);
        assert!(!validate(&f));

        let mut f = feed(vec![]);
        f["draws"][0]["drawEvents"] = json!({});
        assert!(!validate(&f));
    }

    #[test]
    fn rejects_duplicate_match_ids() {
        let f = feed(vec![event(42, "Arsenal - Chelsea"), event(42, "Everton - Fulham")]);
        assert!(!validate(&f));
    }

    #[test]
    fn rejects_numeric_string_duplicate_of_number() {
        let mut second = event(0, "Everton - Fulham");
        second["match"]["matchId"] = json!("42");
        let f = feed(vec![event(42, "Arsenal - Chelsea"), second]);
        assert!(!validate(&f));
    }

    #[test]
    fn accepts_ids_wider_than_u64() {
        let mut ev = event(0, "Arsenal - Chelsea");
        ev["match"]["matchId"] = json!("123456789012345678901");
        assert!(validate(&feed(vec![ev, event(1, "Everton - Fulham")])));
    }

    #[test]
    fn rejects_missing_separator() {
        let f = feed(vec![event(1, "Arsenal vs Chelsea")]);
        assert!(!validate(&f));
    }

    #[test]
    fn rejects_non_numeric_odds() {
        let mut ev = event(1, "Arsenal - Chelsea");
        ev["odds"] = json!({"one": "abc", "x": "def", "two": "ghi"});
        assert!(!validate(&feed(vec![ev])));
    }

    #[test]
    fn tolerates_negative_and_missing_odds() {
        let mut ev = event(1, "Arsenal - Chelsea");
        ev["odds"] = json!({"home": -1.5, "draw": "3.1"});
        assert!(validate(&feed(vec![ev])));
    }

    #[test]
    fn rejects_missing_match_time_and_id() {
        let mut ev = event(1, "Arsenal - Chelsea");
        ev["match"].as_object_mut().unwrap().remove("matchStart");
        assert!(!validate(&feed(vec![ev])));

        let mut ev = event(1, "Arsenal - Chelsea");
        ev["match"].as_object_mut().unwrap().remove("matchId");
        assert!(!validate(&feed(vec![ev])));
    }

    #[test]
    fn falls_back_to_top_level_id() {
        let mut ev = event(1, "Arsenal - Chelsea");
        ev["match"].as_object_mut().unwrap().remove("matchId");
        ev["id"] = json!("9001");
        assert!(validate(&feed(vec![ev])));
    }

    #[test]
    fn only_first_draw_is_checked() {
        let mut f = feed(vec![event(1, "Arsenal - Chelsea")]);
        f["draws"].as_array_mut().unwrap().push(json!({"garbage": true}));
        assert!(validate(&f));
    }
}
