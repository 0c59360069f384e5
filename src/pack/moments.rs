//! Moment selection: 3–5 highlight candidates per match.
//!
//! Policy, in order:
//! 1. TEAMFIGHT / PATTERN events in sorted order, at least
//!    [`MOMENT_SPACING_SECS`] apart, up to [`MAX_MOMENTS`].
//! 2. If fewer than [`MIN_MOMENTS`], SNAPSHOT events under the same spacing
//!    rule (continuing from the last accepted timestamp).
//! 3. If still short, the earliest remaining events, no spacing.

use std::collections::HashSet;

use super::models::{Event, EventType, Moment};

pub const MIN_MOMENTS: usize = 3;
pub const MAX_MOMENTS: usize = 5;
pub const MOMENT_SPACING_SECS: i64 = 90;
/// Moment window is `[ts - pad, ts + pad]`, clamped at 0.
pub const MOMENT_PADDING_SECS: i64 = 30;

/// Which pool a selected event was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    Primary,
    SnapshotFallback,
    Padding,
}

impl SelectionTier {
    /// The first reason follows the event's type, not the tier: a padded
    /// TEAMFIGHT still reports where it came from.
    fn reasons(self, event_type: EventType) -> Vec<String> {
        let origin = if is_primary_type(event_type) {
            format!("Selected from {event_type} candidates")
        } else {
            "Selected as fallback".to_string()
        };
        let mut reasons = vec![origin, "Deterministic spacing rule applied".to_string()];
        if self == SelectionTier::Padding {
            reasons.push("Padded from earliest events".to_string());
        }
        reasons
    }
}

fn is_primary_type(event_type: EventType) -> bool {
    matches!(event_type, EventType::Teamfight | EventType::Pattern)
}

fn is_primary(e: &Event) -> bool {
    is_primary_type(e.event_type())
}

/// Pick the events that become moments, in selection order.
pub fn select_events(events: &[Event]) -> Vec<(&Event, SelectionTier)> {
    let mut selected: Vec<(&Event, SelectionTier)> = Vec::new();
    let mut taken: HashSet<&str> = HashSet::new();
    let mut last_ts: Option<i64> = None;

    let spaced = |ts: i64, last: Option<i64>| {
        last.map_or(true, |l| ts.abs_diff(l) >= MOMENT_SPACING_SECS.unsigned_abs())
    };

    for e in events.iter().filter(|e| is_primary(e)) {
        if selected.len() >= MAX_MOMENTS {
            break;
        }
        if spaced(e.ts, last_ts) {
            selected.push((e, SelectionTier::Primary));
            taken.insert(&e.evidence_id);
            last_ts = Some(e.ts);
        }
    }

    if selected.len() < MIN_MOMENTS {
        for e in events.iter().filter(|e| e.event_type() == EventType::Snapshot) {
            if selected.len() >= MIN_MOMENTS {
                break;
            }
            if !taken.contains(e.evidence_id.as_str()) && spaced(e.ts, last_ts) {
                selected.push((e, SelectionTier::SnapshotFallback));
                taken.insert(&e.evidence_id);
                last_ts = Some(e.ts);
            }
        }
    }

    if selected.len() < MIN_MOMENTS {
        for e in events {
            if selected.len() >= MIN_MOMENTS {
                break;
            }
            if taken.insert(&e.evidence_id) {
                selected.push((e, SelectionTier::Padding));
            }
        }
    }

    selected.truncate(MAX_MOMENTS);
    selected
}

/// Build the moments of one match from its sorted event list.
///
/// Returns fewer than [`MIN_MOMENTS`] only when the match itself has fewer
/// events; the pipeline treats that as fatal.
pub fn build_moments(match_id: &str, events: &[Event]) -> Vec<Moment> {
    select_events(events)
        .into_iter()
        .enumerate()
        .map(|(i, (e, tier))| {
            let title = match e.event_type() {
                EventType::Pattern => "Pattern Moment",
                _ => "Critical Moment",
            };
            Moment {
                match_id: match_id.to_string(),
                moment_id: format!("{}:M{:02}", match_id, i + 1),
                title: title.to_string(),
                description: format!(
                    "At {}, detected {} relevant to macro decision-making.",
                    e.game_time,
                    e.event_type().as_str().to_lowercase()
                ),
                start_ts: e.ts.saturating_sub(MOMENT_PADDING_SECS).max(0),
                end_ts: e.ts.saturating_add(MOMENT_PADDING_SECS),
                passes_validity_filter: true,
                validity_reasons: tier.reasons(e.event_type()),
                primary_event_ref: e.evidence_id.clone(),
                // Extension point: the base policy links no secondary events.
                related_event_refs: Vec::new(),
            }
        })
        .collect()
}
