//! Raw match documents → the four pack stores.
//!
//! Per-match work (parsing, events, moments) is independent and runs on
//! blocking workers; everything that needs the full match set (team ids,
//! patterns, panels) runs after all workers have joined, over matches sorted
//! by id.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use super::determinism::EvidenceIdError;
use super::events::synthesize_events;
use super::models::{MatchArtifacts, PackStores};
use super::moments::{build_moments, MIN_MOMENTS};
use super::panels::build_evidence_panels;
use super::team_patterns::{build_patterns, team_ids};
use crate::telemetry::{parse_match, InputError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    EvidenceId(#[from] EvidenceIdError),

    #[error(
        "match {match_id} produced {events} events; at least {} are needed for its moments",
        MIN_MOMENTS
    )]
    TooFewEvents { match_id: String, events: usize },

    #[error("match id {0} appears more than once in the input set")]
    DuplicateMatch(String),
}

/// Parse one match and derive its events and moments.
pub fn build_match(match_id: &str, raw: &Value) -> Result<MatchArtifacts, PipelineError> {
    let frames = parse_match(match_id, raw)?;
    if frames.skipped_players > 0 {
        warn!(
            "Match {}: skipped {} player entries without usable coordinates",
            match_id, frames.skipped_players
        );
    }

    let events = synthesize_events(&frames)?;
    if events.len() < MIN_MOMENTS {
        return Err(PipelineError::TooFewEvents {
            match_id: match_id.to_string(),
            events: events.len(),
        });
    }
    let moments = build_moments(match_id, &events);

    info!(
        "Match {}: {} frames → {} events, {} moments",
        match_id,
        frames.frames.len(),
        events.len(),
        moments.len()
    );

    Ok(MatchArtifacts {
        match_id: match_id.to_string(),
        events,
        moments,
    })
}

/// Combine per-match artifacts into the global stores.
pub fn assemble(
    mut matches: Vec<MatchArtifacts>,
    window_secs: i64,
) -> Result<PackStores, PipelineError> {
    matches.sort_by(|a, b| a.match_id.cmp(&b.match_id));
    if let Some(dup) = matches.windows(2).find(|w| w[0].match_id == w[1].match_id) {
        return Err(PipelineError::DuplicateMatch(dup[0].match_id.clone()));
    }

    let panels = build_evidence_panels(&matches, window_secs);

    let mut events_by_match = BTreeMap::new();
    let mut moments_by_match = BTreeMap::new();
    for m in matches {
        events_by_match.insert(m.match_id.clone(), m.events);
        moments_by_match.insert(m.match_id, m.moments);
    }

    let teams = team_ids(events_by_match.keys());
    let patterns = build_patterns(&teams, &moments_by_match);

    Ok(PackStores {
        events_by_match,
        moments_by_match,
        patterns,
        panels,
    })
}

/// Build every match on a blocking worker, then assemble.
///
/// `inputs` are `(match_id, document)` pairs in any order; the output does not
/// depend on it.
pub async fn build_stores(inputs: Vec<(String, Value)>, window_secs: i64) -> Result<PackStores> {
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|(match_id, raw)| {
            tokio::task::spawn_blocking(move || build_match(&match_id, &raw))
        })
        .collect();

    let mut matches = Vec::with_capacity(handles.len());
    for joined in futures_util::future::join_all(handles).await {
        let artifacts = joined.context("match worker panicked")??;
        matches.push(artifacts);
    }

    let stores = assemble(matches, window_secs)?;
    info!(
        "Assembled {} matches: {} events, {} moments, {} patterns, {} panels",
        stores.events_by_match.len(),
        stores.total_events(),
        stores.total_moments(),
        stores.patterns.len(),
        stores.panels.len()
    );
    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::panels::DEFAULT_CONTEXT_WINDOW_SECS;
    use crate::pack::determinism::is_valid_evidence_id;
    use crate::telemetry::generator::{make_demo_match, base_game, generate_demo_matches};
    use crate::telemetry::generator::tests::base_snapshot;
    use serde_json::json;

    fn demo_inputs(frames: usize) -> Vec<(String, Value)> {
        generate_demo_matches(&base_snapshot(), frames)
    }

    #[test]
    fn test_example_match_from_base_snapshot() {
        let doc = make_demo_match(&base_game(&base_snapshot()), "TL-C9-G2", 0, 120);
        let artifacts = build_match("TL-C9-G2", &doc).unwrap();

        let first = &artifacts.events[0];
        assert_eq!(first.evidence_id, "TL-C9-G2:000001");
        assert_eq!(first.ts, 0);
        assert!(artifacts
            .events
            .iter()
            .any(|e| e.ts == 0 && e.event_type() == crate::pack::models::EventType::Snapshot));
        assert!((3..=5).contains(&artifacts.moments.len()));
    }

    #[test]
    fn test_legacy_snapshot_builds_three_moments() {
        let artifacts = build_match("TL-C9-G2", &base_snapshot()).unwrap();
        // Six frames, one minute apart, each with a snapshot and a fight.
        assert_eq!(artifacts.events.len(), 12);
        assert!((3..=5).contains(&artifacts.moments.len()));
    }

    #[test]
    fn test_too_few_events_is_fatal() {
        let raw = json!({"frames": [{"ts": 0, "game": {"teams": []}}, {"ts": 10}]});
        assert!(matches!(
            build_match("TL-C9-G2", &raw),
            Err(PipelineError::TooFewEvents { events: 1, .. })
        ));
    }

    #[test]
    fn test_timestamps_near_i64_max_build() {
        // largest multiple of 60 below i64::MAX, so all three frames snapshot
        let far = i64::MAX / 60 * 60;
        let raw = json!({"frames": [{"ts": 0}, {"ts": 60}, {"ts": far}]});
        let artifacts = build_match("TL-C9-G2", &raw).unwrap();
        assert_eq!(artifacts.events.len(), 3);
        let latest_end = artifacts.moments.iter().map(|m| m.end_ts).max();
        assert_eq!(latest_end, Some(i64::MAX));

        let stores = assemble(vec![artifacts], DEFAULT_CONTEXT_WINDOW_SECS).unwrap();
        let panel = &stores.panels["TL-C9-G2:000003"];
        assert_eq!(panel.context_window.len(), 1);
    }

    #[test]
    fn test_unknown_shape_is_fatal() {
        assert!(matches!(
            build_match("TL-C9-G2", &json!({"foo": 1})),
            Err(PipelineError::Input(InputError::UnknownSchema { .. }))
        ));
    }

    #[test]
    fn test_duplicate_match_ids_rejected() {
        let a = build_match("TL-C9-G2", &base_snapshot()).unwrap();
        let err = assemble(vec![a.clone(), a], DEFAULT_CONTEXT_WINDOW_SECS).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateMatch(_)));
    }

    #[tokio::test]
    async fn test_build_is_deterministic_regardless_of_input_order() {
        let inputs = demo_inputs(60);
        let mut reversed = inputs.clone();
        reversed.reverse();

        let a = build_stores(inputs, DEFAULT_CONTEXT_WINDOW_SECS).await.unwrap();
        let b = build_stores(reversed, DEFAULT_CONTEXT_WINDOW_SECS).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_pack_invariants_hold() {
        let stores = build_stores(demo_inputs(60), DEFAULT_CONTEXT_WINDOW_SECS)
            .await
            .unwrap();
        assert_eq!(stores.events_by_match.len(), 6);

        let mut all_ids = std::collections::HashSet::new();
        for (match_id, events) in &stores.events_by_match {
            let seqs: Vec<u32> = events.iter().map(|e| e.global_seq).collect();
            assert_eq!(seqs, (1..=events.len() as u32).collect::<Vec<_>>());
            for e in events {
                assert_eq!(&e.match_id, match_id);
                assert!(is_valid_evidence_id(&e.evidence_id));
                assert!(all_ids.insert(e.evidence_id.clone()));
                assert!(stores.panels.contains_key(&e.evidence_id));
            }
            let moments = &stores.moments_by_match[match_id];
            assert!((3..=5).contains(&moments.len()));
            for m in moments {
                assert!(events.iter().any(|e| e.evidence_id == m.primary_event_ref));
            }
        }

        // 3 teams × 3 kinds, one instance per match
        assert_eq!(stores.patterns.len(), 9);
        for p in &stores.patterns {
            assert_eq!(p.instances.len(), 6);
            for inst in &p.instances {
                for r in &inst.evidence_refs {
                    assert_eq!(stores.panels[r].match_id, inst.match_id);
                }
            }
        }
    }
}
