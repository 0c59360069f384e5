//! Post-hoc reference walk over a pack. Problems are collected, not raised, so
//! one run reports all of them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

use super::{load_stores, PackPaths, STORE_VERSION};
use crate::pack::determinism::is_valid_evidence_id;
use crate::pack::models::PackStores;
use crate::pack::moments::{MAX_MOMENTS, MIN_MOMENTS};
use crate::pack::DEMO_SAMPLE_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub version: u32,
    #[serde(default)]
    pub pack_root: Option<String>,
    pub integrity_ok: bool,
    pub total_events: usize,
    pub total_moments: usize,
    pub total_patterns: usize,
    pub broken_refs: usize,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    fn from_errors(stores: &PackStores, errors: Vec<String>) -> Self {
        IntegrityReport {
            version: STORE_VERSION,
            pack_root: None,
            integrity_ok: errors.is_empty(),
            total_events: stores.total_events(),
            total_moments: stores.total_moments(),
            total_patterns: stores.patterns.len(),
            broken_refs: errors.len(),
            errors,
        }
    }
}

/// Walk every reference in `stores`.
pub fn verify_stores(stores: &PackStores, expected_matches: Option<usize>) -> IntegrityReport {
    let mut errors = Vec::new();

    // match_id -> evidence ids of that match
    let mut ids_by_match: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for (match_id, events) in &stores.events_by_match {
        let ids = ids_by_match.entry(match_id.as_str()).or_default();
        for (idx, e) in events.iter().enumerate() {
            if &e.match_id != match_id {
                errors.push(format!(
                    "{match_id}: event {} carries match_id {}",
                    e.evidence_id, e.match_id
                ));
            }
            if !is_valid_evidence_id(&e.evidence_id) {
                errors.push(format!("{match_id}: invalid evidence_id {:?}", e.evidence_id));
            }
            if !seen.insert(&e.evidence_id) {
                errors.push(format!("{match_id}: duplicate evidence_id {}", e.evidence_id));
            }
            if let Some(prev) = idx.checked_sub(1).map(|i| &events[i]) {
                if e.ts < prev.ts {
                    errors.push(format!(
                        "{match_id}: event {} at ts {} follows ts {} out of order",
                        e.evidence_id, e.ts, prev.ts
                    ));
                }
            }
            let expected_seq = idx as u32 + 1;
            if e.global_seq != expected_seq {
                errors.push(format!(
                    "{match_id}: global_seq {} at position {} (expected {expected_seq})",
                    e.global_seq, idx
                ));
            }
            ids.insert(&e.evidence_id);
        }
    }

    for (match_id, events) in &stores.events_by_match {
        let moments = stores
            .moments_by_match
            .get(match_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if !(MIN_MOMENTS..=MAX_MOMENTS).contains(&moments.len()) {
            errors.push(format!(
                "{match_id}: moment count {} outside {MIN_MOMENTS}..={MAX_MOMENTS}",
                moments.len()
            ));
        }
        if events.is_empty() {
            errors.push(format!("{match_id}: no events"));
        }
    }

    for (match_id, moments) in &stores.moments_by_match {
        let ids = ids_by_match.get(match_id.as_str());
        if ids.is_none() {
            errors.push(format!("{match_id}: moments without an events entry"));
        }
        let resolves = |r: &str| ids.is_some_and(|s| s.contains(r));
        for m in moments {
            if &m.match_id != match_id {
                errors.push(format!(
                    "{match_id}: moment {} carries match_id {}",
                    m.moment_id, m.match_id
                ));
            }
            if !m.passes_validity_filter || m.validity_reasons.is_empty() {
                errors.push(format!("{}: failed validity filter", m.moment_id));
            }
            if !resolves(&m.primary_event_ref) {
                errors.push(format!(
                    "{}: primary_event_ref {} not found in match",
                    m.moment_id, m.primary_event_ref
                ));
            }
            for r in &m.related_event_refs {
                if !resolves(r) {
                    errors.push(format!("{}: related_event_ref {r} not found in match", m.moment_id));
                }
            }
        }
    }

    for p in &stores.patterns {
        if p.sample_size != DEMO_SAMPLE_SIZE {
            errors.push(format!(
                "{}: sample_size {} (expected {DEMO_SAMPLE_SIZE})",
                p.pattern_id, p.sample_size
            ));
        }
        if !(0.0..=1.0).contains(&p.frequency) {
            errors.push(format!("{}: frequency {} outside [0, 1]", p.pattern_id, p.frequency));
        }
        if p.instances.is_empty() {
            errors.push(format!("{}: no instances", p.pattern_id));
        }
        for inst in &p.instances {
            for r in &inst.evidence_refs {
                if !stores.panels.contains_key(r) {
                    errors.push(format!("{}: evidence ref {r} has no panel", p.pattern_id));
                }
            }
        }
    }

    for (match_id, events) in &stores.events_by_match {
        for e in events {
            let Some(panel) = stores.panels.get(&e.evidence_id) else {
                errors.push(format!("{}: missing evidence panel", e.evidence_id));
                continue;
            };
            if &panel.match_id != match_id || panel.evidence_id != e.evidence_id {
                errors.push(format!("{}: panel keyed to the wrong event", e.evidence_id));
            }
            if panel.context_window.iter().any(|c| &c.match_id != match_id) {
                errors.push(format!("{}: context window leaks another match", e.evidence_id));
            }
            if panel.related_moments.iter().any(|m| &m.match_id != match_id) {
                errors.push(format!("{}: related moments leak another match", e.evidence_id));
            }
        }
    }

    if let Some(expected) = expected_matches {
        let actual = stores.events_by_match.len();
        if actual != expected {
            errors.push(format!("expected {expected} matches, found {actual}"));
        }
    }

    IntegrityReport::from_errors(stores, errors)
}

/// Load the stores under `root` and verify them. A missing or unreadable
/// store is reported as an error instead of being raised.
pub fn verify_pack(root: &Path, expected_matches: Option<usize>) -> IntegrityReport {
    let paths = PackPaths::new(root);
    let mut report = match load_stores(&paths) {
        Ok(stores) => {
            let mut report = verify_stores(&stores, expected_matches);
            if !paths.matches_dir().is_dir() {
                report.errors.push(format!("missing {:?}", paths.matches_dir()));
                report.broken_refs = report.errors.len();
                report.integrity_ok = false;
            }
            report
        }
        Err(e) => IntegrityReport::from_errors(
            &PackStores::default(),
            vec![format!("{e}; fix: {}", e.fix())],
        ),
    };
    report.pack_root = Some(root.display().to_string());

    if report.integrity_ok {
        info!(
            "Integrity OK: {} events, {} moments, {} patterns",
            report.total_events, report.total_moments, report.total_patterns
        );
    } else {
        warn!("Integrity check found {} problems", report.broken_refs);
        for err in &report.errors {
            warn!("  {}", err);
        }
    }
    report
}
