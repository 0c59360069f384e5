//! Synthetic demo matches derived from a single real snapshot.
//!
//! Every coordinate gets a small, fully deterministic shift so that the six
//! matches are not identical to each other and frames wobble a little over time.

use serde_json::{json, Value};

/// Match ids of the demo corpus. Team ids are the first two tokens.
pub const DEMO_MATCH_IDS: [&str; 6] = [
    "TL-C9-G2",
    "TL-C9-G3",
    "TL-100-G1",
    "TL-100-G2",
    "C9-100-G1",
    "C9-100-G2",
];

/// Seconds between generated frames.
pub const FRAME_SPACING_SECS: i64 = 10;

pub fn deterministic_shift(val: f64, match_idx: usize, frame_idx: usize) -> f64 {
    val + (match_idx as f64 * 7.0) + ((frame_idx % 10) as f64 - 5.0) * 0.3
}

/// First game of a `data.seriesState.games` snapshot, or an empty game.
pub fn base_game(base: &Value) -> Value {
    base.pointer("/data/seriesState/games/0")
        .or_else(|| base.pointer("/data/data/seriesState/games/0"))
        .cloned()
        .unwrap_or_else(|| json!({ "teams": [] }))
}

/// Build one `{match_id, frames, meta}` document with `frames` frames.
pub fn make_demo_match(game0: &Value, match_id: &str, match_idx: usize, frames: usize) -> Value {
    let out_frames: Vec<Value> = (0..frames)
        .map(|frame_idx| {
            let mut game = game0.clone();
            shift_positions(&mut game, match_idx, frame_idx);
            json!({
                "ts": frame_idx as i64 * FRAME_SPACING_SECS,
                "game": game,
            })
        })
        .collect();

    json!({
        "match_id": match_id,
        "frames": out_frames,
        "meta": {
            "source": "derived_from_real_data_snapshot",
            "frames": frames,
            "dt_seconds": FRAME_SPACING_SECS,
        },
    })
}

/// Generate the full demo corpus from one base snapshot document.
pub fn generate_demo_matches(base: &Value, frames: usize) -> Vec<(String, Value)> {
    let game0 = base_game(base);
    DEMO_MATCH_IDS
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.to_string(), make_demo_match(&game0, id, idx, frames)))
        .collect()
}

fn shift_positions(game: &mut Value, match_idx: usize, frame_idx: usize) {
    let Some(teams) = game.get_mut("teams").and_then(Value::as_array_mut) else {
        return;
    };
    for team in teams {
        let Some(players) = team.get_mut("players").and_then(Value::as_array_mut) else {
            continue;
        };
        for player in players {
            let Some(pos) = player.get_mut("position").and_then(Value::as_object_mut) else {
                continue;
            };
            let (Some(x), Some(y)) = (
                pos.get("x").and_then(Value::as_f64),
                pos.get("y").and_then(Value::as_f64),
            ) else {
                continue;
            };
            pos.insert("x".into(), json!(deterministic_shift(x, match_idx, frame_idx)));
            pos.insert("y".into(), json!(deterministic_shift(y, match_idx, frame_idx)));
        }
    }
}
