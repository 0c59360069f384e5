//! Evidence panels, one per event.
//!
//! Panels are built from a single [`MatchArtifacts`] at a time, so a panel can
//! only ever see events and moments of its own match.

use std::collections::BTreeMap;

use super::models::{EvidencePanel, FeatureSnapshot, MatchArtifacts};

pub const DEFAULT_CONTEXT_WINDOW_SECS: i64 = 60;

/// Panels for every event of one match.
pub fn build_match_panels(artifacts: &MatchArtifacts, window_secs: i64) -> Vec<EvidencePanel> {
    let MatchArtifacts {
        match_id,
        events,
        moments,
    } = artifacts;

    events
        .iter()
        .map(|e| {
            let (lo, hi) = (e.ts.saturating_sub(window_secs), e.ts.saturating_add(window_secs));
            EvidencePanel {
                evidence_id: e.evidence_id.clone(),
                match_id: match_id.clone(),
                event: e.clone(),
                context_window: events
                    .iter()
                    .filter(|x| lo <= x.ts && x.ts <= hi)
                    .cloned()
                    .collect(),
                feature_snapshot: FeatureSnapshot {
                    event_type: e.event_type(),
                    ts: e.ts,
                    match_scoped: true,
                },
                related_moments: moments.iter().filter(|m| m.contains(e.ts)).cloned().collect(),
            }
        })
        .collect()
}

/// Panels for every match, keyed by evidence id.
pub fn build_evidence_panels(
    matches: &[MatchArtifacts],
    window_secs: i64,
) -> BTreeMap<String, EvidencePanel> {
    matches
        .iter()
        .flat_map(|artifacts| build_match_panels(artifacts, window_secs))
        .map(|panel| (panel.evidence_id.clone(), panel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::models::EventType::{Snapshot as S, Teamfight as T};
    use crate::pack::moments::build_moments;
    use crate::pack::moments::tests::events_from;

    fn artifacts(match_id: &str) -> MatchArtifacts {
        let events = events_from(
            match_id,
            &[(0, S), (50, T), (60, S), (120, S), (170, T), (180, S), (300, T)],
        );
        let moments = build_moments(match_id, &events);
        MatchArtifacts {
            match_id: match_id.to_string(),
            events,
            moments,
        }
    }

    #[test]
    fn test_context_window_is_symmetric_and_inclusive() {
        let a = artifacts("TL-C9-G2");
        let panels = build_match_panels(&a, DEFAULT_CONTEXT_WINDOW_SECS);
        assert_eq!(panels.len(), a.events.len());

        // Event at ts=60: window [0, 120]
        let p = &panels[2];
        assert_eq!(p.event.ts, 60);
        let ctx: Vec<i64> = p.context_window.iter().map(|e| e.ts).collect();
        assert_eq!(ctx, vec![0, 50, 60, 120]);
        assert_eq!(p.feature_snapshot.ts, 60);
        assert!(p.feature_snapshot.match_scoped);
    }

    #[test]
    fn test_related_moments_contain_event_ts() {
        let a = artifacts("TL-C9-G2");
        let panels = build_match_panels(&a, DEFAULT_CONTEXT_WINDOW_SECS);
        // Moments are around 50, 170 and 300; ts=180 sits in [140, 200].
        let p = panels.iter().find(|p| p.event.ts == 180).unwrap();
        let ids: Vec<&str> = p.related_moments.iter().map(|m| m.moment_id.as_str()).collect();
        assert_eq!(ids, vec!["TL-C9-G2:M02"]);
        let p = panels.iter().find(|p| p.event.ts == 120).unwrap();
        assert!(p.related_moments.is_empty());
    }

    #[test]
    fn test_panels_never_cross_matches() {
        let matches = vec![artifacts("TL-C9-G2"), artifacts("C9-100-G1")];
        let panels = build_evidence_panels(&matches, DEFAULT_CONTEXT_WINDOW_SECS);
        assert_eq!(panels.len(), 14);
        for (id, p) in &panels {
            assert_eq!(id, &p.evidence_id);
            assert!(id.starts_with(&p.match_id));
            assert!(p.context_window.iter().all(|e| e.match_id == p.match_id));
            assert!(p.related_moments.iter().all(|m| m.match_id == p.match_id));
        }
    }
}
