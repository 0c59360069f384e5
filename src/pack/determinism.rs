//! Building blocks that make pack output reproducible byte for byte.
//!
//! Events MUST be sorted by [`SortKey`] before sequence numbers and evidence
//! ids are assigned. Tie-breakers go from most to least semantic:
//!
//! 1. `ts` (seconds)
//! 2. `event_type`
//! 3. `stable_payload_hash` (canonical JSON of the payload)
//! 4. `raw_index` (source frame index, only to make the order total)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Locked wire format for evidence identifiers.
pub const EVIDENCE_ID_PATTERN: &str = r"^[A-Z0-9-]+:\d{6}$";

static EVIDENCE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(EVIDENCE_ID_PATTERN).expect("evidence id pattern compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("generated evidence id has invalid format: {0}")]
pub struct EvidenceIdError(pub String);

/// `MM:SS` game clock. Negative timestamps clamp to `00:00`.
pub fn format_game_time(ts_seconds: i64) -> String {
    let ts = ts_seconds.max(0);
    format!("{:02}:{:02}", ts / 60, ts % 60)
}

pub fn is_valid_evidence_id(evidence_id: &str) -> bool {
    EVIDENCE_ID_RE.is_match(evidence_id)
}

/// `<MATCH_ID>:<6-digit seq>`. A match id outside `[A-Z0-9-]` is a programming
/// error upstream and is reported rather than silently rewritten.
pub fn make_evidence_id(match_id: &str, global_seq: u32) -> Result<String, EvidenceIdError> {
    let evidence_id = format!("{match_id}:{global_seq:06}");
    if !is_valid_evidence_id(&evidence_id) {
        return Err(EvidenceIdError(evidence_id));
    }
    Ok(evidence_id)
}

/// Canonical compact JSON of a value: object keys sorted, `,`/`:` separators.
///
/// Used only as a sort tie-breaker, never as a storage content hash.
pub fn stable_hash(value: &Value) -> String {
    // Relies on serde_json's Map being a BTreeMap: the `preserve_order`
    // feature must stay off or key order (and every store byte) changes.
    value.to_string()
}

/// Pretty, key-sorted JSON used for every file written into a pack.
pub fn canonical_json_pretty<T: Serialize>(data: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(data)?;
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    Ok(out)
}

/// Total order over synthesised events. Field order is the comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub ts: i64,
    pub event_type: &'static str,
    pub stable_payload_hash: String,
    pub raw_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_game_time() {
        assert_eq!(format_game_time(0), "00:00");
        assert_eq!(format_game_time(59), "00:59");
        assert_eq!(format_game_time(61), "01:01");
        assert_eq!(format_game_time(3600), "60:00");
        assert_eq!(format_game_time(-45), "00:00");
    }

    #[test]
    fn test_make_evidence_id() {
        assert_eq!(make_evidence_id("TL-C9-G2", 1).unwrap(), "TL-C9-G2:000001");
        assert_eq!(make_evidence_id("C9-100-G1", 123456).unwrap(), "C9-100-G1:123456");
    }

    #[test]
    fn test_make_evidence_id_rejects_bad_match_ids() {
        assert!(make_evidence_id("tl-c9-g2", 1).is_err());
        assert!(make_evidence_id("TL C9", 1).is_err());
        assert!(make_evidence_id("TL:C9", 1).is_err());
        assert!(make_evidence_id("", 1).is_err());
        // Seven digits no longer fits the locked format
        assert_eq!(
            make_evidence_id("TL", 1_000_000),
            Err(EvidenceIdError("TL:1000000".into()))
        );
    }

    #[test]
    fn test_stable_hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"teams":2,"frame_idx":7}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"frame_idx":7,"teams":2}"#).unwrap();
        assert_eq!(stable_hash(&a), stable_hash(&b));
        assert_eq!(stable_hash(&a), r#"{"frame_idx":7,"teams":2}"#);
    }

    #[test]
    fn test_stable_hash_sorts_nested_objects() {
        let v = json!({"b": {"z": 1, "a": [1, {"y": 0, "x": 0}]}, "a": null});
        assert_eq!(stable_hash(&v), r#"{"a":null,"b":{"a":[1,{"x":0,"y":0}],"z":1}}"#);
    }

    #[test]
    fn test_sort_key_tiebreak_order() {
        let key = |ts, ty, hash: &str, idx| SortKey {
            ts,
            event_type: ty,
            stable_payload_hash: hash.to_string(),
            raw_index: idx,
        };
        let mut keys = vec![
            key(60, "SNAPSHOT", "{}", 0),
            key(60, "PATTERN", "{\"b\"}", 3),
            key(0, "TEAMFIGHT", "{}", 9),
            key(60, "PATTERN", "{\"a\"}", 5),
            key(60, "PATTERN", "{\"a\"}", 1),
        ];
        keys.sort();
        let order: Vec<(i64, &str, usize)> =
            keys.iter().map(|k| (k.ts, k.event_type, k.raw_index)).collect();
        assert_eq!(
            order,
            vec![
                (0, "TEAMFIGHT", 9),
                (60, "PATTERN", 1),
                (60, "PATTERN", 5),
                (60, "PATTERN", 3),
                (60, "SNAPSHOT", 0),
            ]
        );
    }

    #[test]
    fn test_parsed_objects_keep_sorted_key_order() {
        let v: Value = serde_json::from_str(r#"{"zeta": 1, "mid": {"b": 2, "a": 1}, "alpha": 0}"#).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
        assert_eq!(
            canonical_json_pretty(&v).unwrap(),
            "{\n  \"alpha\": 0,\n  \"mid\": {\n    \"a\": 1,\n    \"b\": 2\n  },\n  \"zeta\": 1\n}\n"
        );
    }

    #[test]
    fn test_canonical_json_pretty_sorts_keys() {
        #[derive(Serialize)]
        struct Out {
            zeta: u8,
            alpha: u8,
        }
        let text = canonical_json_pretty(&Out { zeta: 1, alpha: 2 }).unwrap();
        assert_eq!(text, "{\n  \"alpha\": 2,\n  \"zeta\": 1\n}\n");
    }
}
