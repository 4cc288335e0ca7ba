//! Player tracking
//!
//! Associates the motion boxes of each frame with players. On a green light
//! boxes follow existing players or create new ones; on a red light any box
//! whose center falls inside a live player's box eliminates that player.

use std::time::Instant;

use super::phase::Phase;
use super::state::{Player, PlayerId, Roster};
use crate::config::TrackerConfig;
use crate::vision::{distance, BoundingBox};

/// Maintains player identities across frames
#[derive(Debug, Clone)]
pub struct PlayerTracker {
    config: TrackerConfig,
    next_id: u64,
}

impl PlayerTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config, next_id: 1 }
    }

    /// Matching and grace parameters in use
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Apply one frame of motion boxes to the roster.
    ///
    /// Players whose grace period has run out are dropped first. Matching is
    /// first-fit in roster order, not best-fit.
    pub fn track(
        &mut self,
        boxes: &[BoundingBox],
        roster: Roster,
        phase: Phase,
        now: Instant,
    ) -> Roster {
        let mut roster = roster.pruned(now, self.config.grace());

        match phase {
            Phase::Green => {
                for bbox in boxes {
                    self.follow_or_join(&mut roster, *bbox, now);
                }
            }
            Phase::Red => {
                for bbox in boxes {
                    eliminate_touched(&mut roster, bbox, now);
                }
            }
            Phase::ReadFaces | Phase::End => {}
        }

        roster
    }

    fn follow_or_join(&mut self, roster: &mut Roster, bbox: BoundingBox, now: Instant) {
        let center = bbox.center();
        let radius = self.config.match_radius();

        if let Some(player) = roster
            .iter_mut()
            .filter(|p| !p.is_eliminated())
            .find(|p| distance(center, p.center()) < radius)
        {
            player.update(bbox, now);
            return;
        }

        let id = self.allocate_id();
        log::debug!("New player {} at {:?}", id, bbox);
        roster.insert(Player::new(id, bbox, now));
    }

    fn allocate_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn eliminate_touched(roster: &mut Roster, bbox: &BoundingBox, now: Instant) {
    let center = bbox.center();
    for player in roster.iter_mut() {
        if !player.is_eliminated() && player.bbox.contains_point(center) {
            player.eliminate(now);
            log::debug!("Player {} moved on red light", player.id);
        }
    }
}
