//! Per-team pattern summaries.
//!
//! This is a templated baseline computed within the demo dataset only: the
//! three kinds, their frequencies and the sample size are fixed. What any
//! replacement must keep is the structure: one instance per match, each
//! pointing at the primary event of a real moment in that match.

use std::collections::{BTreeMap, BTreeSet};

use super::models::{ConfidenceLevel, Moment, PatternInstance, TeamPattern};

/// Size of the demo corpus. Integrity checks assert on this exact value.
pub const DEMO_SAMPLE_SIZE: u32 = 6;

/// `(kind, label, description)` in emission order.
const PATTERN_KINDS: [(&str, &str, &str); 3] = [
    (
        "tempo_reset",
        "Tempo Reset",
        "Team stabilizes after a high-variance sequence.",
    ),
    (
        "objective_setup",
        "Objective Setup",
        "Team positions earlier around major objectives.",
    ),
    (
        "river_risk",
        "River Risk",
        "Team enters river with higher contest risk.",
    ),
];

/// Team ids are the first two `-`separated tokens of each match id
/// (`TL-C9-G2` → `TL`, `C9`), deduplicated and sorted.
pub fn team_ids<'a>(match_ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    match_ids
        .into_iter()
        .flat_map(|id| id.split('-').take(2))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `min(1, 0.15·idx + 0.05)` rounded to two decimals, idx starting at 1.
pub fn pattern_frequency(idx: usize) -> f64 {
    let raw = (0.15 * idx as f64 + 0.05).min(1.0);
    (raw * 100.0).round() / 100.0
}

/// Build three patterns per team. Instances walk matches in id order and pick
/// moment `(idx - 1) mod len` of each.
pub fn build_patterns(
    team_ids: &[String],
    moments_by_match: &BTreeMap<String, Vec<Moment>>,
) -> Vec<TeamPattern> {
    let confidence_level = ConfidenceLevel::from_sample_size(DEMO_SAMPLE_SIZE);

    team_ids
        .iter()
        .flat_map(|team_id| {
            PATTERN_KINDS
                .iter()
                .enumerate()
                .map(move |(i, (kind, label, description))| {
                    let idx = i + 1;
                    let instances = moments_by_match
                        .iter()
                        .filter(|(_, moments)| !moments.is_empty())
                        .map(|(match_id, moments)| {
                            let m = &moments[(idx - 1) % moments.len()];
                            PatternInstance {
                                match_id: match_id.clone(),
                                evidence_refs: vec![m.primary_event_ref.clone()],
                                note: Some(format!("Derived from moment {}", m.moment_id)),
                            }
                        })
                        .collect();
                    TeamPattern {
                        team_id: team_id.clone(),
                        pattern_id: format!("{team_id}:{kind}"),
                        label: label.to_string(),
                        description: description.to_string(),
                        confidence_level,
                        frequency: pattern_frequency(idx),
                        sample_size: DEMO_SAMPLE_SIZE,
                        instances,
                    }
                })
        })
        .collect()
}
