//! Deterministic match identifiers.
//!
//! The feed numbers its fixtures with plain integers. Internally every match is
//! keyed by an id in the 8-4-4-4-12 layout that is a pure function of that
//! integer, so the same upstream fixture lands on the same row on every sync.
//!
//! Ids wider than `ID_PAD_WIDTH` digits are not truncated, but two ids that
//! only differ past that width share their first two segments. Raw ids are
//! held as `u128`: digit strings up to 39 digits are accepted, and the last
//! segment wraps for ids above `u128::MAX / ID_PRIME` (35 digits and up).

use crate::config::{ID_PAD_WIDTH, ID_PRIME, ID_VERSION_SEGMENT};

/// A feed match id that passed the numeric check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawMatchId(u128);

impl RawMatchId {
    #[cfg(test)]
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    /// Accepts a non-negative JSON integer or a string of ASCII digits.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        if let Some(n) = v.as_u64() {
            return Some(Self(u128::from(n)));
        }
        // Integers wider than u64 arrive as floats; they keep f64 precision.
        if let Some(f) = v.as_f64() {
            if f >= 0.0 && f.fract() == 0.0 && f < u128::MAX as f64 {
                return Some(Self(f as u128));
            }
            return None;
        }
        v.as_str().and_then(Self::parse)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u128>().ok().map(Self)
    }
}

impl std::fmt::Display for RawMatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the internal match id for a raw feed id.
///
/// `42` → `00000000-0042-4000-002a-000000051336`
pub fn derive_match_id(raw: RawMatchId) -> String {
    let padded = format!("{:0>width$}", raw.0, width = ID_PAD_WIDTH);
    let value = raw.0;

    let head = &padded[..8];
    let tail = &padded[padded.len() - 4..];
    let modulo = value % 4096;
    let scrambled = value.wrapping_mul(ID_PRIME);

    format!("{head}-{tail}-{ID_VERSION_SEGMENT}-{modulo:04x}-{scrambled:012x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_id_matches_segment_construction() {
        // 42 * 7919 = 332598 = 0x51336
        let id = derive_match_id(RawMatchId::new(42));
        assert_eq!(id, format!("00000000-0042-4000-002a-{:012x}", 42u128 * 7919));
        assert_eq!(id, "00000000-0042-4000-002a-000000051336");
    }

    #[test]
    fn same_input_same_output() {
        let a = derive_match_id(RawMatchId::new(987_654_321));
        let b = derive_match_id(RawMatchId::new(987_654_321));
        assert_eq!(a, b);
        assert_eq!(a, "09876543-4321-4000-08b1-071d05e87b3f");
    }

    #[test]
    fn distinct_inputs_distinct_outputs() {
        let a = derive_match_id(RawMatchId::new(1_000_001));
        let b = derive_match_id(RawMatchId::new(1_000_002));
        assert_ne!(a, b);
    }

    #[test]
    fn layout_is_8_4_4_4_12() {
        let id = derive_match_id(RawMatchId::new(9_999_999_999));
        let lens: Vec<usize> = id.split('-').map(str::len).collect();
        assert_eq!(lens, vec![8, 4, 4, 4, 12]);
    }

    #[test]
    fn ids_wider_than_u64_are_accepted() {
        let wide = "123456789012345678901";
        let raw = RawMatchId::from_json(&serde_json::json!(wide)).unwrap();
        assert_eq!(raw, RawMatchId::new(123_456_789_012_345_678_901));
        assert_eq!(raw.to_string(), wide);

        let id = derive_match_id(raw);
        let segments: Vec<&str> = id.split('-').collect();
        assert_eq!(segments[0], "12345678");
        assert_eq!(segments[1], "8901");
        assert_eq!(
            segments[4],
            format!("{:012x}", 123_456_789_012_345_678_901u128 * 7919)
        );

        let big_number: serde_json::Value = serde_json::from_str("123456789012345678901").unwrap();
        assert!(RawMatchId::from_json(&big_number).is_some());

        let max = RawMatchId::parse(&u128::MAX.to_string()).unwrap();
        assert_eq!(derive_match_id(max), derive_match_id(max));
        assert_eq!(RawMatchId::parse("1000000000000000000000000000000000000000"), None);
    }

    #[test]
    fn parses_numbers_and_digit_strings() {
        assert_eq!(RawMatchId::from_json(&serde_json::json!(42)), Some(RawMatchId::new(42)));
        assert_eq!(RawMatchId::from_json(&serde_json::json!("42")), Some(RawMatchId::new(42)));
        assert_eq!(RawMatchId::from_json(&serde_json::json!(" 0042 ")), Some(RawMatchId::new(42)));
        assert_eq!(RawMatchId::from_json(&serde_json::json!("abc")), None);
        assert_eq!(RawMatchId::from_json(&serde_json::json!(-3)), None);
        assert_eq!(RawMatchId::from_json(&serde_json::json!(1.5)), None);
        assert_eq!(RawMatchId::from_json(&serde_json::json!(null)), None);
    }
}
