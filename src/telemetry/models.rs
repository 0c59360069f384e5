use serde::{Deserialize, Serialize};

/// A map coordinate in game units (Summoner's Rift is roughly 15000 × 15000).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// One player's state inside a frame. Players without usable coordinates never
/// make it into this type; the parser drops them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPosition {
    pub id: String,
    pub name: String,
    pub position: Point,
    pub alive: bool,
}

/// A normalised telemetry frame: timestamp plus per-team player positions.
/// `teams[0]` is the first team listed in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Seconds from match start.
    pub ts: i64,
    pub teams: Vec<Vec<PlayerPosition>>,
}

/// A parsed match ready for event synthesis.
#[derive(Debug, Clone)]
pub struct MatchFrames {
    pub match_id: String,
    pub frames: Vec<Frame>,
    /// Players dropped because their position was missing or malformed.
    pub skipped_players: usize,
}
