use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::heuristics::PatternLabel;

/// Event type tag as persisted in `event_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Snapshot,
    Teamfight,
    Pattern,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Snapshot => "SNAPSHOT",
            EventType::Teamfight => "TEAMFIGHT",
            EventType::Pattern => "PATTERN",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Periodic position snapshot. Kept float-free so the payload hash is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub frame_idx: usize,
    pub teams: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamfightPayload {
    pub frame_idx: usize,
    pub teams: usize,
    pub detected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternPayload {
    pub pattern_id: PatternLabel,
    pub label: String,
}

/// Typed payload, one variant per event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Snapshot(SnapshotPayload),
    Teamfight(TeamfightPayload),
    Pattern(PatternPayload),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Snapshot(_) => EventType::Snapshot,
            EventKind::Teamfight(_) => EventType::Teamfight,
            EventKind::Pattern(_) => EventType::Pattern,
        }
    }

    /// The payload as a JSON object, exactly as it is persisted.
    pub fn payload_value(&self) -> Value {
        match self {
            EventKind::Snapshot(p) => json!({
                "frame_idx": p.frame_idx,
                "teams": p.teams,
            }),
            EventKind::Teamfight(p) => json!({
                "frame_idx": p.frame_idx,
                "teams": p.teams,
                "detected": p.detected,
            }),
            EventKind::Pattern(p) => json!({
                "pattern_id": p.pattern_id.id(),
                "label": p.label,
            }),
        }
    }

    fn from_parts(event_type: EventType, payload: Value) -> serde_json::Result<Self> {
        Ok(match event_type {
            EventType::Snapshot => EventKind::Snapshot(serde_json::from_value(payload)?),
            EventType::Teamfight => EventKind::Teamfight(serde_json::from_value(payload)?),
            EventType::Pattern => EventKind::Pattern(serde_json::from_value(payload)?),
        })
    }
}

/// A sequenced event of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    pub match_id: String,
    /// Seconds from match start.
    pub ts: i64,
    /// `MM:SS`
    pub game_time: String,
    pub kind: EventKind,
    /// `<MATCH_ID>:<6-digit global_seq>`
    pub evidence_id: String,
    /// 1-based, dense within the match.
    pub global_seq: u32,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// Wire shape of [`Event`]: the type tag and payload sit side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventRecord {
    match_id: String,
    ts: i64,
    game_time: String,
    event_type: EventType,
    payload: Value,
    evidence_id: String,
    global_seq: u32,
}

impl TryFrom<EventRecord> for Event {
    type Error = serde_json::Error;

    fn try_from(r: EventRecord) -> Result<Self, Self::Error> {
        Ok(Event {
            kind: EventKind::from_parts(r.event_type, r.payload)?,
            match_id: r.match_id,
            ts: r.ts,
            game_time: r.game_time,
            evidence_id: r.evidence_id,
            global_seq: r.global_seq,
        })
    }
}

impl From<Event> for EventRecord {
    fn from(e: Event) -> Self {
        EventRecord {
            event_type: e.kind.event_type(),
            payload: e.kind.payload_value(),
            match_id: e.match_id,
            ts: e.ts,
            game_time: e.game_time,
            evidence_id: e.evidence_id,
            global_seq: e.global_seq,
        }
    }
}

/// A highlight candidate: a short window around one primary event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub match_id: String,
    /// `<MATCH_ID>:M<nn>`
    pub moment_id: String,
    pub title: String,
    pub description: String,
    pub start_ts: i64,
    pub end_ts: i64,
    pub passes_validity_filter: bool,
    pub validity_reasons: Vec<String>,
    /// Evidence id of the event this moment is built around.
    pub primary_event_ref: String,
    #[serde(default)]
    pub related_event_refs: Vec<String>,
}

impl Moment {
    pub fn contains(&self, ts: i64) -> bool {
        self.start_ts <= ts && ts <= self.end_ts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// n ≥ 20 → high, 10–19 → medium, otherwise low.
    pub fn from_sample_size(sample_size: u32) -> Self {
        if sample_size >= 20 {
            ConfidenceLevel::High
        } else if sample_size >= 10 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInstance {
    pub match_id: String,
    pub evidence_refs: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Team-scoped recurring behaviour summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPattern {
    pub team_id: String,
    /// `<TEAM>:<kind>`
    pub pattern_id: String,
    pub label: String,
    pub description: String,
    pub confidence_level: ConfidenceLevel,
    /// In [0, 1].
    pub frequency: f64,
    pub sample_size: u32,
    pub instances: Vec<PatternInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub event_type: EventType,
    pub ts: i64,
    pub match_scoped: bool,
}

/// Everything a reviewer needs to judge one event, scoped to its match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePanel {
    pub evidence_id: String,
    pub match_id: String,
    pub event: Event,
    pub context_window: Vec<Event>,
    pub feature_snapshot: FeatureSnapshot,
    #[serde(default)]
    pub related_moments: Vec<Moment>,
}

/// Per-match output of the synthesiser and moment selector.
#[derive(Debug, Clone)]
pub struct MatchArtifacts {
    pub match_id: String,
    pub events: Vec<Event>,
    pub moments: Vec<Moment>,
}

/// The four stores of a pack, keyed for stable iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackStores {
    pub events_by_match: BTreeMap<String, Vec<Event>>,
    pub moments_by_match: BTreeMap<String, Vec<Moment>>,
    pub patterns: Vec<TeamPattern>,
    pub panels: BTreeMap<String, EvidencePanel>,
}

impl PackStores {
    pub fn total_events(&self) -> usize {
        self.events_by_match.values().map(Vec::len).sum()
    }

    pub fn total_moments(&self) -> usize {
        self.moments_by_match.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_event() -> Event {
        Event {
            match_id: "TL-C9-G2".into(),
            ts: 600,
            game_time: "10:00".into(),
            kind: EventKind::Pattern(PatternPayload {
                pattern_id: PatternLabel::SplitPush1v4,
                label: "Split Push 1-4".into(),
            }),
            evidence_id: "TL-C9-G2:000004".into(),
            global_seq: 4,
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let v = serde_json::to_value(pattern_event()).unwrap();
        assert_eq!(v["event_type"], "PATTERN");
        assert_eq!(v["payload"]["pattern_id"], "split_push_1_4");
        assert_eq!(v["payload"]["label"], "Split Push 1-4");
        assert_eq!(v["global_seq"], 4);
        assert!(v.get("kind").is_none());
    }

    #[test]
    fn test_event_deserialises_typed_payload() {
        let raw = r#"{
            "match_id": "TL-C9-G2", "ts": 60, "game_time": "01:00",
            "event_type": "TEAMFIGHT",
            "payload": {"frame_idx": 6, "teams": 2, "detected": true},
            "evidence_id": "TL-C9-G2:000002", "global_seq": 2
        }"#;
        let e: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(
            e.kind,
            EventKind::Teamfight(TeamfightPayload { frame_idx: 6, teams: 2, detected: true })
        );
    }

    #[test]
    fn test_event_rejects_payload_of_wrong_variant() {
        let raw = r#"{
            "match_id": "TL-C9-G2", "ts": 60, "game_time": "01:00",
            "event_type": "PATTERN",
            "payload": {"frame_idx": 6, "teams": 2},
            "evidence_id": "TL-C9-G2:000002", "global_seq": 2
        }"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }

    #[test]
    fn test_payload_value_matches_serialised_payload() {
        let e = pattern_event();
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["payload"], e.kind.payload_value());
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(ConfidenceLevel::from_sample_size(6), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_sample_size(9), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_sample_size(10), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_sample_size(19), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_sample_size(20), ConfidenceLevel::High);
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_moment_window_is_inclusive() {
        let m = Moment {
            match_id: "TL-C9-G2".into(),
            moment_id: "TL-C9-G2:M01".into(),
            title: "Critical Moment".into(),
            description: String::new(),
            start_ts: 30,
            end_ts: 90,
            passes_validity_filter: true,
            validity_reasons: vec![],
            primary_event_ref: "TL-C9-G2:000001".into(),
            related_event_refs: vec![],
        };
        assert!(m.contains(30));
        assert!(m.contains(90));
        assert!(!m.contains(91));
    }
}
