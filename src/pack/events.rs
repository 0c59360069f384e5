//! Turns normalised frames into the canonical, sequenced event log of a match.

use tracing::debug;

use super::determinism::{format_game_time, make_evidence_id, stable_hash, EvidenceIdError, SortKey};
use super::models::{Event, EventKind, PatternPayload, SnapshotPayload, TeamfightPayload};
use crate::heuristics::{detect_patterns, detect_teamfight, DEFAULT_VISION_SCORE};
use crate::telemetry::{Frame, MatchFrames};

/// A SNAPSHOT event is emitted on every frame whose timestamp is a multiple of this.
pub const SNAPSHOT_INTERVAL_SECS: i64 = 60;

/// An event before sorting and sequencing.
#[derive(Debug, Clone)]
struct Candidate {
    ts: i64,
    kind: EventKind,
    raw_index: usize,
}

impl Candidate {
    fn sort_key(&self) -> SortKey {
        SortKey {
            ts: self.ts,
            event_type: self.kind.event_type().as_str(),
            stable_payload_hash: stable_hash(&self.kind.payload_value()),
            raw_index: self.raw_index,
        }
    }
}

fn frame_candidates(frame_idx: usize, frame: &Frame) -> Vec<Candidate> {
    let mut out = Vec::new();
    let teams = frame.teams.len();

    if frame.ts.rem_euclid(SNAPSHOT_INTERVAL_SECS) == 0 {
        out.push(Candidate {
            ts: frame.ts,
            kind: EventKind::Snapshot(SnapshotPayload { frame_idx, teams }),
            raw_index: frame_idx,
        });
    }

    if detect_teamfight(&frame.teams) {
        out.push(Candidate {
            ts: frame.ts,
            kind: EventKind::Teamfight(TeamfightPayload {
                frame_idx,
                teams,
                detected: true,
            }),
            raw_index: frame_idx,
        });
    }

    // Pattern detection looks at the first team only.
    let first_team = frame.teams.first().map(Vec::as_slice).unwrap_or(&[]);
    for label in detect_patterns(first_team, frame.ts, DEFAULT_VISION_SCORE) {
        out.push(Candidate {
            ts: frame.ts,
            kind: EventKind::Pattern(PatternPayload {
                pattern_id: label,
                label: label.label().to_string(),
            }),
            raw_index: frame_idx,
        });
    }

    out
}

/// Synthesise the event log for one match.
///
/// Candidates from every frame are collected first, sorted by [`SortKey`], and
/// only then numbered `1..=N`. Sequencing before sorting would leak the input
/// enumeration order into the ids.
pub fn synthesize_events(frames: &MatchFrames) -> Result<Vec<Event>, EvidenceIdError> {
    let mut keyed: Vec<(SortKey, Candidate)> = frames
        .frames
        .iter()
        .enumerate()
        .flat_map(|(idx, frame)| frame_candidates(idx, frame))
        .map(|c| (c.sort_key(), c))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    let events = keyed
        .into_iter()
        .enumerate()
        .map(|(i, (_, c))| {
            let global_seq = i as u32 + 1;
            Ok(Event {
                match_id: frames.match_id.clone(),
                ts: c.ts,
                game_time: format_game_time(c.ts),
                kind: c.kind,
                evidence_id: make_evidence_id(&frames.match_id, global_seq)?,
                global_seq,
            })
        })
        .collect::<Result<Vec<_>, EvidenceIdError>>()?;

    debug!(
        "Synthesised {} events for {} from {} frames",
        events.len(),
        frames.match_id,
        frames.frames.len()
    );
    Ok(events)
}
