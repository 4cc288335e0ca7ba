//! Events emitted by the game controller

use std::time::Instant;

use super::phase::Phase;
use super::state::PlayerId;
use crate::vision::BoundingBox;

/// Something that happened during a frame
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
        at: Instant,
    },
    PlayerJoined {
        id: PlayerId,
        bbox: BoundingBox,
        at: Instant,
    },
    PlayerEliminated { id: PlayerId, at: Instant },
    /// An eliminated player's grace period ran out
    PlayerRemoved { id: PlayerId, at: Instant },
    PlayerWon { id: PlayerId, at: Instant },
    /// Roster and results were cleared; play resumes in `phase`
    Restarted { phase: Phase, at: Instant },
    GameOver {
        winners: Vec<PlayerId>,
        eliminated: Vec<PlayerId>,
        at: Instant,
    },
}

impl GameEvent {
    /// When the event happened
    pub fn timestamp(&self) -> Instant {
        match self {
            GameEvent::PhaseChanged { at, .. }
            | GameEvent::PlayerJoined { at, .. }
            | GameEvent::PlayerEliminated { at, .. }
            | GameEvent::PlayerRemoved { at, .. }
            | GameEvent::PlayerWon { at, .. }
            | GameEvent::Restarted { at, .. }
            | GameEvent::GameOver { at, .. } => *at,
        }
    }
}

/// Callback type for game events
pub type EventCallback = Box<dyn FnMut(&GameEvent) + Send>;

/// Fan-out of game events to any number of listeners
pub struct EventHandler {
    callbacks: Vec<EventCallback>,
}

impl EventHandler {
    /// Create a handler with no listeners
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Register a listener; listeners are called in registration order
    pub fn subscribe(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Deliver `event` to every listener
    pub fn emit(&mut self, event: GameEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
