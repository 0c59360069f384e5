//! Read-only views over a loaded pack. Each returns a serialisable response
//! the CLI prints as JSON.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use super::{Benchmarks, LoadedPack, PackMetadata};
use crate::heuristics::PatternLabel;
use crate::pack::models::{EvidencePanel, Moment, TeamPattern};
use crate::pack::{team_ids, ObservationMasking, DEMO_SAMPLE_SIZE};

pub const BASELINE_NOTE: &str = "Baseline computed within demo dataset only";

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("unknown match_id: {0}")]
    UnknownMatch(String),

    // never includes the id
    #[error("unknown evidence reference; fix: rebuild the pack or refresh the view")]
    UnknownEvidence,
}

/// One entry of the macro-pattern detector's label set.
#[derive(Debug, Serialize)]
pub struct DetectorLabel {
    pub id: &'static str,
    pub label: &'static str,
    pub win_rate: f64,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PackSummary<'a> {
    pub pack_root: &'a Path,
    pub matches: usize,
    pub evidence_panels: usize,
    pub baseline_note: &'static str,
    pub dataset: Option<&'a PackMetadata>,
    pub benchmarks: Option<&'a Benchmarks>,
    pub detector_labels: Vec<DetectorLabel>,
}

#[derive(Debug, Serialize)]
pub struct MatchList {
    pub matches: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamList {
    pub teams: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchMoments<'a> {
    pub match_id: &'a str,
    pub moments: &'a [Moment],
}

#[derive(Debug, Serialize)]
pub struct PanelView<'a> {
    pub panel: &'a EvidencePanel,
}

#[derive(Debug, Serialize)]
pub struct ScoutReport<'a> {
    pub team_id: &'a str,
    pub sample_size: u32,
    pub baseline_note: &'static str,
    pub patterns: Vec<&'a TeamPattern>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MaskingView<'a> {
    Report(&'a ObservationMasking),
    Missing { status: &'static str, note: &'static str },
}

pub fn summary(pack: &LoadedPack) -> PackSummary<'_> {
    PackSummary {
        pack_root: &pack.root,
        matches: pack.stores.events_by_match.len(),
        evidence_panels: pack.stores.panels.len(),
        baseline_note: BASELINE_NOTE,
        dataset: pack.metadata.as_ref(),
        benchmarks: pack.benchmarks.as_ref(),
        detector_labels: PatternLabel::ALL
            .iter()
            .map(|&l| DetectorLabel {
                id: l.id(),
                label: l.label(),
                win_rate: l.win_rate(),
                description: l.description(),
            })
            .collect(),
    }
}

pub fn list_matches(pack: &LoadedPack) -> MatchList {
    MatchList {
        matches: pack.stores.events_by_match.keys().cloned().collect(),
    }
}

pub fn list_teams(pack: &LoadedPack) -> TeamList {
    TeamList {
        teams: team_ids(pack.stores.events_by_match.keys()),
    }
}

pub fn moments<'a>(pack: &'a LoadedPack, match_id: &'a str) -> Result<MatchMoments<'a>, QueryError> {
    let moments = pack
        .stores
        .moments_by_match
        .get(match_id)
        .ok_or_else(|| QueryError::UnknownMatch(match_id.to_string()))?;
    Ok(MatchMoments { match_id, moments })
}

pub fn panel<'a>(pack: &'a LoadedPack, evidence_id: &str) -> Result<PanelView<'a>, QueryError> {
    pack.stores
        .panels
        .get(evidence_id)
        .map(|panel| PanelView { panel })
        .ok_or(QueryError::UnknownEvidence)
}

/// Patterns for one team. An unknown team gets an empty list rather than an
/// error.
pub fn scout_team<'a>(pack: &'a LoadedPack, team_id: &'a str) -> ScoutReport<'a> {
    ScoutReport {
        team_id,
        sample_size: DEMO_SAMPLE_SIZE,
        baseline_note: BASELINE_NOTE,
        patterns: pack
            .stores
            .patterns
            .iter()
            .filter(|p| p.team_id == team_id)
            .collect(),
    }
}

pub fn observation_masking(pack: &LoadedPack) -> MaskingView<'_> {
    match &pack.observation_masking {
        Some(report) => MaskingView::Report(report),
        None => MaskingView::Missing {
            status: "missing",
            note: "No observation masking metrics in this pack.",
        },
    }
}
