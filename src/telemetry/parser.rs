//! Normalises raw match documents into [`MatchFrames`].
//!
//! Only a closed set of document shapes is understood (see [`InputSchema`]).
//! Anything else is rejected instead of being guessed at, but *inside* a known
//! shape the parser is lenient: players with missing coordinates are skipped
//! and frames without a team snapshot simply contribute no players.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::models::{Frame, MatchFrames, PlayerPosition, Point};

/// Timestamps used when a single legacy snapshot is expanded into frames.
pub const LEGACY_FRAME_TIMESTAMPS: [i64; 6] = [0, 60, 120, 180, 240, 300];

/// Fallback spacing between frames that carry no `ts` field.
const DEFAULT_FRAME_SPACING_SECS: i64 = 10;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read match file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list match directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("match file {path:?} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("match {match_id}: unrecognised document shape (expected `frames` or `data.seriesState.games`)")]
    UnknownSchema { match_id: String },

    #[error("match {match_id}: no frames could be derived from the document")]
    NoFrames { match_id: String },
}

/// The document shapes accepted as match input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSchema {
    /// `{ "frames": [ { "ts": .., "game": { "teams": [..] } }, .. ] }`
    Frames,
    /// `{ "data": { "seriesState": { "games": [..] } } }`
    SeriesSnapshot,
    /// `{ "data": { "data": { "seriesState": { "games": [..] } } } }`
    NestedSeriesSnapshot,
}

impl InputSchema {
    pub fn detect(raw: &Value) -> Option<InputSchema> {
        if let Some(frames) = raw.get("frames") {
            return match frames.as_array() {
                Some(list) if list.iter().all(Value::is_object) => Some(InputSchema::Frames),
                _ => None,
            };
        }
        if raw
            .pointer("/data/data/seriesState/games")
            .is_some_and(Value::is_array)
        {
            return Some(InputSchema::NestedSeriesSnapshot);
        }
        if raw
            .pointer("/data/seriesState/games")
            .is_some_and(Value::is_array)
        {
            return Some(InputSchema::SeriesSnapshot);
        }
        None
    }

    fn games_pointer(self) -> &'static str {
        match self {
            InputSchema::Frames => "/frames",
            InputSchema::SeriesSnapshot => "/data/seriesState/games",
            InputSchema::NestedSeriesSnapshot => "/data/data/seriesState/games",
        }
    }
}

/// Read a match document from disk.
pub fn load_match_file(path: &Path) -> Result<Value, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| InputError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every `*.json` file of `dir` in file-name order as
/// `(match_id, document)` pairs.
pub fn load_match_dir(dir: &Path) -> Result<Vec<(String, Value)>, InputError> {
    let read_dir_err = |source| InputError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = load_match_file(&path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let match_id = match_id_for(&raw, &stem);
        debug!("Loaded {:?} as {}", path, match_id);
        docs.push((match_id, raw));
    }
    Ok(docs)
}

/// The match id is taken from the document when present, otherwise from the
/// caller (usually the file stem).
pub fn match_id_for(raw: &Value, fallback: &str) -> String {
    raw.get("match_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Parse a raw match document into normalised frames.
pub fn parse_match(match_id: &str, raw: &Value) -> Result<MatchFrames, InputError> {
    let schema = InputSchema::detect(raw).ok_or_else(|| InputError::UnknownSchema {
        match_id: match_id.to_string(),
    })?;

    let mut skipped_players = 0usize;
    let frames = match schema {
        InputSchema::Frames => raw
            .pointer(schema.games_pointer())
            .and_then(Value::as_array)
            .map(|frames| {
                frames
                    .iter()
                    .enumerate()
                    .map(|(idx, frame)| parse_frame(idx, frame, &mut skipped_players))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default(),
        InputSchema::SeriesSnapshot | InputSchema::NestedSeriesSnapshot => {
            let game0 = raw
                .pointer(schema.games_pointer())
                .and_then(Value::as_array)
                .and_then(|games| games.first());
            match game0 {
                Some(game) => {
                    // Every expanded frame shares the same snapshot.
                    let teams = parse_teams(game, &mut skipped_players);
                    LEGACY_FRAME_TIMESTAMPS
                        .iter()
                        .map(|&ts| Frame {
                            ts,
                            teams: teams.clone(),
                        })
                        .collect()
                }
                None => Vec::new(),
            }
        }
    };

    if frames.is_empty() {
        return Err(InputError::NoFrames {
            match_id: match_id.to_string(),
        });
    }

    debug!(
        "Parsed match {} ({:?}): {} frames, {} players skipped",
        match_id,
        schema,
        frames.len(),
        skipped_players
    );

    Ok(MatchFrames {
        match_id: match_id.to_string(),
        frames,
        skipped_players,
    })
}

fn parse_frame(idx: usize, frame: &Value, skipped: &mut usize) -> Frame {
    let ts = frame
        .get("ts")
        .and_then(as_seconds)
        .unwrap_or(idx as i64 * DEFAULT_FRAME_SPACING_SECS);

    let game = frame
        .get("game")
        .filter(|g| g.is_object())
        .or_else(|| frame.pointer("/data/seriesState/games/0"));

    let teams = game.map(|g| parse_teams(g, skipped)).unwrap_or_default();
    Frame { ts, teams }
}

fn parse_teams(game: &Value, skipped: &mut usize) -> Vec<Vec<PlayerPosition>> {
    let Some(teams) = game.get("teams").and_then(Value::as_array) else {
        return Vec::new();
    };

    teams
        .iter()
        .map(|team| {
            team.get("players")
                .and_then(Value::as_array)
                .map(|players| {
                    players
                        .iter()
                        .filter_map(|p| {
                            let parsed = parse_player(p);
                            if parsed.is_none() {
                                *skipped += 1;
                            }
                            parsed
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

fn parse_player(p: &Value) -> Option<PlayerPosition> {
    let pos = p.get("position")?;
    let x = as_coordinate(pos.get("x")?)?;
    let y = as_coordinate(pos.get("y")?)?;
    Some(PlayerPosition {
        id: display_value(p.get("id")),
        name: display_value(p.get("name")),
        position: Point::new(x, y),
        alive: p.get("alive").and_then(Value::as_bool).unwrap_or(true),
    })
}

fn as_seconds(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_coordinate(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|f: &f64| f.is_finite())
}

fn display_value(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn game_json() -> Value {
        json!({
            "teams": [
                {"players": [
                    {"id": 1, "name": "blue-top", "position": {"x": 1000, "y": 9000}},
                    {"id": 2, "name": "blue-mid", "position": {"x": 7000.5, "y": 7100}, "alive": false},
                    {"id": 3, "name": "blue-ghost", "position": {"x": null, "y": 10}},
                    {"id": 4, "name": "blue-nopos"}
                ]},
                {"players": [
                    {"id": "r1", "name": "red-top", "position": {"x": "1200", "y": "8800"}}
                ]}
            ]
        })
    }

    #[test]
    fn test_detect_frames_schema() {
        let raw = json!({"frames": [{"ts": 0, "game": game_json()}]});
        assert_eq!(InputSchema::detect(&raw), Some(InputSchema::Frames));
    }

    #[test]
    fn test_detect_legacy_schemas() {
        let flat = json!({"data": {"seriesState": {"games": [game_json()]}}});
        let nested = json!({"data": {"data": {"seriesState": {"games": [game_json()]}}}});
        assert_eq!(InputSchema::detect(&flat), Some(InputSchema::SeriesSnapshot));
        assert_eq!(
            InputSchema::detect(&nested),
            Some(InputSchema::NestedSeriesSnapshot)
        );
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let raw = json!({"events": []});
        let err = parse_match("TL-C9-G1", &raw).unwrap_err();
        assert!(matches!(err, InputError::UnknownSchema { .. }));

        // `frames` present but not a list of objects is not silently reinterpreted.
        let raw = json!({"frames": [1, 2, 3]});
        assert!(InputSchema::detect(&raw).is_none());
    }

    #[test]
    fn test_frames_skip_players_without_coordinates() {
        let raw = json!({"frames": [{"ts": 60, "game": game_json()}]});
        let parsed = parse_match("TL-C9-G1", &raw).unwrap();
        assert_eq!(parsed.frames.len(), 1);
        let frame = &parsed.frames[0];
        assert_eq!(frame.ts, 60);
        assert_eq!(frame.teams.len(), 2);
        assert_eq!(frame.teams[0].len(), 2);
        assert_eq!(frame.teams[1].len(), 1);
        assert_eq!(parsed.skipped_players, 2);
        assert!(!frame.teams[0][1].alive);
        assert_eq!(frame.teams[0][0].id, "1");
        assert_eq!(frame.teams[1][0].position, Point::new(1200.0, 8800.0));
    }

    #[test]
    fn test_missing_ts_falls_back_to_index_spacing() {
        let raw = json!({"frames": [{"game": game_json()}, {"game": game_json()}, {}]});
        let parsed = parse_match("TL-C9-G1", &raw).unwrap();
        let ts: Vec<i64> = parsed.frames.iter().map(|f| f.ts).collect();
        assert_eq!(ts, vec![0, 10, 20]);
        // A frame without any snapshot still exists, with no players.
        assert!(parsed.frames[2].teams.is_empty());
    }

    #[test]
    fn test_legacy_snapshot_expands_to_six_frames() {
        let raw = json!({"data": {"seriesState": {"games": [game_json()]}}});
        let parsed = parse_match("TL-C9-G1", &raw).unwrap();
        let ts: Vec<i64> = parsed.frames.iter().map(|f| f.ts).collect();
        assert_eq!(ts, LEGACY_FRAME_TIMESTAMPS.to_vec());
        assert!(parsed.frames.iter().all(|f| f.teams == parsed.frames[0].teams));
    }

    #[test]
    fn test_empty_inputs_fail_loudly() {
        let raw = json!({"data": {"seriesState": {"games": []}}});
        assert!(matches!(
            parse_match("TL-C9-G1", &raw),
            Err(InputError::NoFrames { .. })
        ));
        let raw = json!({"frames": []});
        assert!(matches!(
            parse_match("TL-C9-G1", &raw),
            Err(InputError::NoFrames { .. })
        ));
    }

    #[test]
    fn test_match_id_prefers_document_field() {
        assert_eq!(match_id_for(&json!({"match_id": "C9-100-G1"}), "file"), "C9-100-G1");
        assert_eq!(match_id_for(&json!({}), "TL-100-G2"), "TL-100-G2");
    }

    #[test]
    fn test_load_match_dir_sorted_json_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.json"), r#"{"frames": []}"#).unwrap();
        std::fs::write(tmp.path().join("a.json"), r#"{"match_id": "TL-C9-G2", "frames": []}"#).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_match_dir(tmp.path()).unwrap();
        let ids: Vec<_> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["TL-C9-G2", "b"]);
    }

    #[test]
    fn test_load_match_dir_reports_bad_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("x.json"), "{").unwrap();
        assert!(matches!(load_match_dir(tmp.path()), Err(InputError::Json { .. })));
        assert!(matches!(
            load_match_dir(&tmp.path().join("missing")),
            Err(InputError::ReadDir { .. })
        ));
    }
}
