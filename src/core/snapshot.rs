//! Read-only views handed to the renderer and to callers at game end

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::phase::Phase;
use super::state::{PlayerId, Roster};
use crate::vision::BoundingBox;
use crate::Result;

/// Outcome of a game so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResults {
    pub winners: Vec<PlayerId>,
    pub eliminated: Vec<PlayerId>,
}

/// One player as the renderer should draw it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub bbox: BoundingBox,
    pub eliminated: bool,
    /// Seconds since elimination, for fading out
    pub eliminated_secs_ago: Option<f64>,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    /// Seconds until the next scheduled phase change
    pub remaining_secs: Option<f64>,
    pub players: Vec<PlayerView>,
    pub active_players: usize,
}

impl GameSnapshot {
    /// Build a snapshot; players outside their grace period are left out
    pub fn capture(
        phase: Phase,
        remaining: Option<Duration>,
        roster: &Roster,
        grace: Duration,
        now: Instant,
    ) -> Self {
        let players = roster
            .iter()
            .filter(|p| p.is_visible(now, grace))
            .map(|p| PlayerView {
                id: p.id,
                bbox: p.bbox,
                eliminated: p.is_eliminated(),
                eliminated_secs_ago: p
                    .eliminated_at
                    .map(|at| now.saturating_duration_since(at).as_secs_f64()),
            })
            .collect();

        Self {
            phase,
            remaining_secs: remaining.map(|d| d.as_secs_f64()),
            players,
            active_players: roster.active_count(),
        }
    }

    /// Encode as a single-line JSON document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
