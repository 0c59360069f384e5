//! Observation masking: how much of the event log a reviewer can skip.
//!
//! Reporting only; it never changes the evidence panels.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::models::{Event, EventType, Moment};

pub const MASKING_WINDOW_SECS: i64 = 60;
const HIGH_SIGNAL_TYPES: [EventType; 2] = [EventType::Teamfight, EventType::Pattern];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingPolicy {
    pub high_signal_event_types: Vec<EventType>,
    pub moment_window_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationMasking {
    pub status: String,
    pub policy: MaskingPolicy,
    pub events_before: usize,
    pub events_after: usize,
    pub reduction_pct: u32,
}

/// Keep every high-signal event plus anything within `window_secs` of a
/// moment window; the rest counts as maskable background.
pub fn compute_observation_masking(
    events_by_match: &BTreeMap<String, Vec<Event>>,
    moments_by_match: &BTreeMap<String, Vec<Moment>>,
    window_secs: i64,
) -> ObservationMasking {
    let mut kept: BTreeSet<&str> = BTreeSet::new();
    let mut total = 0usize;

    for (match_id, events) in events_by_match {
        total += events.len();
        let windows: Vec<(i64, i64)> = moments_by_match
            .get(match_id)
            .map(|ms| {
                ms.iter()
                    .map(|m| {
                        (
                            m.start_ts.saturating_sub(window_secs).max(0),
                            m.end_ts.saturating_add(window_secs),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        for e in events {
            let high_signal = HIGH_SIGNAL_TYPES.contains(&e.event_type());
            if high_signal || windows.iter().any(|&(lo, hi)| lo <= e.ts && e.ts <= hi) {
                kept.insert(&e.evidence_id);
            }
        }
    }

    let events_after = kept.len();
    let reduction_pct = if total == 0 {
        0
    } else {
        ((1.0 - events_after as f64 / total as f64) * 100.0)
            .round_ties_even()
            .clamp(0.0, 100.0) as u32
    };

    let mut types = HIGH_SIGNAL_TYPES.to_vec();
    types.sort_by_key(|t| t.as_str());

    ObservationMasking {
        status: "ok".to_string(),
        policy: MaskingPolicy {
            high_signal_event_types: types,
            moment_window_seconds: window_secs,
        },
        events_before: total,
        events_after,
        reduction_pct,
    }
}
