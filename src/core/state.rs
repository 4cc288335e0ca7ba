//! Player and roster types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::vision::BoundingBox;

/// Stable player identifier; allocated in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A tracked player
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    /// Last matched bounding box; frozen once eliminated
    pub bbox: BoundingBox,
    pub last_seen: Instant,
    /// When the player was caught moving on a red light
    pub eliminated_at: Option<Instant>,
}

impl Player {
    /// A live player first seen at `now`
    pub fn new(id: PlayerId, bbox: BoundingBox, now: Instant) -> Self {
        Self {
            id,
            bbox,
            last_seen: now,
            eliminated_at: None,
        }
    }

    /// Whether the player has been caught moving
    pub fn is_eliminated(&self) -> bool {
        self.eliminated_at.is_some()
    }

    /// Center of the last matched box
    pub fn center(&self) -> (i32, i32) {
        self.bbox.center()
    }

    /// Move the player to a newly matched box
    pub fn update(&mut self, bbox: BoundingBox, now: Instant) {
        self.bbox = bbox;
        self.last_seen = now;
    }

    /// Mark the player as eliminated; later calls keep the first timestamp
    pub fn eliminate(&mut self, now: Instant) -> bool {
        if self.is_eliminated() {
            return false;
        }
        self.eliminated_at = Some(now);
        true
    }

    /// Whether the player is still shown: alive, or eliminated no longer
    /// than `grace` ago
    pub fn is_visible(&self, now: Instant, grace: Duration) -> bool {
        match self.eliminated_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) <= grace,
        }
    }
}

/// Whether the roster has ever held players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupancy {
    /// No player has joined yet
    Waiting,
    /// At least one player is present
    Occupied,
    /// Players joined earlier and all of them are gone
    Emptied,
}

/// Players keyed by id, iterated in join order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    ever_occupied: bool,
}

impl Roster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players, eliminated ones included
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether players are present, gone, or never arrived
    pub fn occupancy(&self) -> Occupancy {
        match (self.players.is_empty(), self.ever_occupied) {
            (false, _) => Occupancy::Occupied,
            (true, true) => Occupancy::Emptied,
            (true, false) => Occupancy::Waiting,
        }
    }

    /// Look up a player by id
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Whether `id` is still in the roster
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// All players in id order
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Players that have not been eliminated
    pub fn active(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.is_eliminated())
    }

    /// Number of players not yet eliminated
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Add or replace a player; marks the roster as having been occupied
    pub fn insert(&mut self, player: Player) {
        self.ever_occupied = true;
        self.players.insert(player.id, player);
    }

    /// Take a player out of the roster
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Eliminate a player by id; false if unknown or already eliminated
    pub fn eliminate(&mut self, id: PlayerId, now: Instant) -> bool {
        self.players
            .get_mut(&id)
            .map(|p| p.eliminate(now))
            .unwrap_or(false)
    }

    /// A copy without the players whose grace period has run out
    pub fn pruned(&self, now: Instant, grace: Duration) -> Roster {
        Roster {
            players: self
                .players
                .iter()
                .filter(|(_, p)| p.is_visible(now, grace))
                .map(|(id, p)| (*id, p.clone()))
                .collect(),
            ever_occupied: self.ever_occupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64, now: Instant) -> Player {
        Player::new(PlayerId(id), BoundingBox::new(0, 0, 10, 10), now)
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P7");
    }

    #[test]
    fn test_eliminate_keeps_first_timestamp() {
        let t0 = Instant::now();
        let mut p = player(1, t0);
        assert!(p.eliminate(t0 + Duration::from_secs(1)));
        assert!(!p.eliminate(t0 + Duration::from_secs(2)));
        assert_eq!(p.eliminated_at, Some(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_visibility_boundary() {
        let t0 = Instant::now();
        let grace = Duration::from_secs(3);
        let mut p = player(1, t0);
        assert!(p.is_visible(t0 + Duration::from_secs(100), grace));

        p.eliminate(t0);
        assert!(p.is_visible(t0 + grace - Duration::from_millis(1), grace));
        assert!(p.is_visible(t0 + grace, grace));
        assert!(!p.is_visible(t0 + grace + Duration::from_millis(1), grace));
    }

    #[test]
    fn test_occupancy() {
        let t0 = Instant::now();
        let mut roster = Roster::new();
        assert_eq!(roster.occupancy(), Occupancy::Waiting);

        roster.insert(player(1, t0));
        assert_eq!(roster.occupancy(), Occupancy::Occupied);

        roster.remove(PlayerId(1));
        assert_eq!(roster.occupancy(), Occupancy::Emptied);
    }

    #[test]
    fn test_iteration_in_join_order() {
        let t0 = Instant::now();
        let mut roster = Roster::new();
        for id in [3, 1, 2] {
            roster.insert(player(id, t0));
        }
        assert_eq!(roster.ids(), vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_pruned_is_pure() {
        let t0 = Instant::now();
        let grace = Duration::from_secs(3);
        let mut roster = Roster::new();
        roster.insert(player(1, t0));
        roster.insert(player(2, t0));
        assert!(roster.eliminate(PlayerId(2), t0));

        let later = t0 + Duration::from_secs(4);
        let pruned = roster.pruned(later, grace);

        assert_eq!(pruned.ids(), vec![PlayerId(1)]);
        assert_eq!(roster.len(), 2);
        assert_eq!(pruned.occupancy(), Occupancy::Occupied);
    }

    #[test]
    fn test_pruned_keeps_history() {
        let t0 = Instant::now();
        let mut roster = Roster::new();
        roster.insert(player(1, t0));
        roster.eliminate(PlayerId(1), t0);

        let pruned = roster.pruned(t0 + Duration::from_secs(10), Duration::from_secs(3));
        assert!(pruned.is_empty());
        assert_eq!(pruned.occupancy(), Occupancy::Emptied);
    }

    #[test]
    fn test_eliminate_unknown() {
        let mut roster = Roster::new();
        assert!(!roster.eliminate(PlayerId(9), Instant::now()));
    }

    #[test]
    fn test_active_count() {
        let t0 = Instant::now();
        let mut roster = Roster::new();
        roster.insert(player(1, t0));
        roster.insert(player(2, t0));
        roster.eliminate(PlayerId(1), t0);
        assert_eq!(roster.active_count(), 1);
        assert_eq!(roster.len(), 2);
    }
}
