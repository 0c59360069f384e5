//! Proximity primitives over player positions.

use crate::telemetry::{PlayerPosition, Point};

/// Two opposing players closer than this (map units) count as engaged.
pub const TF_PLAYER_DISTANCE: f64 = 2000.0;
/// Engaged players required on *each* side for a teamfight.
pub const TF_MIN_PLAYERS_PER_TEAM: usize = 3;

/// Euclidean distance between two map points.
pub fn distance(p1: Point, p2: Point) -> f64 {
    ((p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2)).sqrt()
}

/// Number of players in `team` with at least one player of `opponents`
/// strictly within [`TF_PLAYER_DISTANCE`].
fn engaged_count(team: &[PlayerPosition], opponents: &[PlayerPosition]) -> usize {
    team.iter()
        .filter(|p| {
            opponents
                .iter()
                .any(|o| distance(p.position, o.position) < TF_PLAYER_DISTANCE)
        })
        .count()
}

/// Detect a teamfight between the first two teams of a frame.
///
/// Fires when at least [`TF_MIN_PLAYERS_PER_TEAM`] players of each team are
/// close to some player of the other team. Fewer than two teams never fight.
pub fn detect_teamfight(teams: &[Vec<PlayerPosition>]) -> bool {
    let [blue, red, ..] = teams else {
        return false;
    };
    engaged_count(blue, red) >= TF_MIN_PLAYERS_PER_TEAM
        && engaged_count(red, blue) >= TF_MIN_PLAYERS_PER_TEAM
}
