//! Per-frame game controller
//!
//! Owns the roster, background model, phase clock and face filters, and runs
//! them in a fixed order for every frame:
//! 1. advance the phase clock (a toggle applies to the frame it happens on)
//! 2. detect motion
//! 3. track players under the current phase
//!
//! Commands (quit, restart, force end, faces read) are applied between frames.

use std::collections::BTreeMap;
use std::time::Instant;

use image::{GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::clock::{Clock, SystemClock};
use super::events::{EventCallback, EventHandler, GameEvent};
use super::faces::FaceFilter;
use super::phase::{Phase, PhaseChange, PhaseClock};
use super::snapshot::{GameResults, GameSnapshot};
use super::state::{PlayerId, Roster};
use super::tracker::PlayerTracker;
use crate::config::GameConfig;
use crate::vision::{BoundingBox, MotionDetector, RoiMask};
use crate::Result;

/// External input, delivered between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Clear the roster and start over; the background model is kept
    Restart,
    ForceEnd,
    /// The face-capture subsystem has registered the players
    FacesRead,
}

/// Whether the frame loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// The game state for one camera
pub struct GameController {
    config: GameConfig,
    roi: RoiMask,
    detector: MotionDetector,
    tracker: PlayerTracker,
    phase: PhaseClock,
    roster: Roster,
    faces: BTreeMap<PlayerId, FaceFilter>,
    results: GameResults,
    events: EventHandler,
    clock: Box<dyn Clock>,
}

impl GameController {
    /// Controller on the wall clock with an entropy-seeded random source
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_sources(config, Box::new(SystemClock), Box::new(StdRng::from_entropy()))
    }

    /// Controller with injected time and randomness
    pub fn with_sources(
        config: GameConfig,
        clock: Box<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self> {
        config.validate()?;

        let roi = RoiMask::from_rect(config.frame.width, config.frame.height, config.roi.to_box());
        let now = clock.now();
        let phase = PhaseClock::new(&config.timing, rng, now);
        log::info!(
            "Game ready: {}x{} frames, region {:?}, starting in {}",
            config.frame.width,
            config.frame.height,
            config.roi.to_box(),
            phase.phase()
        );

        Ok(Self {
            detector: MotionDetector::new(config.motion.clone()),
            tracker: PlayerTracker::new(config.tracker.clone()),
            roi,
            phase,
            roster: Roster::new(),
            faces: BTreeMap::new(),
            results: GameResults::default(),
            events: EventHandler::new(),
            clock,
            config,
        })
    }

    /// Validated configuration the game was built from
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current light
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn phase_clock(&self) -> &PhaseClock {
        &self.phase
    }

    /// Players currently tracked, eliminated ones included
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Winners and eliminated players so far
    pub fn results(&self) -> &GameResults {
        &self.results
    }

    pub fn roi(&self) -> &RoiMask {
        &self.roi
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    /// Whether the game has reached End
    pub fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    /// Current time of the injected clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Register a listener for game events
    pub fn on_event(&mut self, callback: EventCallback) {
        self.events.subscribe(callback);
    }

    /// Run one frame at the current time
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let now = self.clock.now();
        self.process_frame_at(frame, now)
    }

    /// Run one frame at `now`. Does nothing once the game is over.
    pub fn process_frame_at(&mut self, frame: &RgbImage, now: Instant) -> Result<()> {
        if self.is_over() {
            return Ok(());
        }
        self.advance_phase(now);
        if self.is_over() {
            return Ok(());
        }

        let boxes = self.detector.detect(frame, &self.roi)?;
        self.apply_detections(&boxes, now);
        Ok(())
    }

    /// Run one frame from precomputed motion boxes at the current time
    pub fn step(&mut self, boxes: &[BoundingBox]) {
        let now = self.clock.now();
        self.step_at(boxes, now);
    }

    /// Run one frame from precomputed motion boxes at `now`
    pub fn step_at(&mut self, boxes: &[BoundingBox], now: Instant) {
        if self.is_over() {
            return;
        }
        self.advance_phase(now);
        if self.is_over() {
            return;
        }
        self.apply_detections(boxes, now);
    }

    fn advance_phase(&mut self, now: Instant) {
        if let Some(change) = self.phase.advance(now, self.roster.occupancy()) {
            self.on_phase_change(change);
        }
    }

    fn on_phase_change(&mut self, change: PhaseChange) {
        if change.to == Phase::Red {
            // movement only counts from the first red frame on
            for filter in self.faces.values_mut() {
                filter.reset_streak();
            }
        }
        self.events.emit(GameEvent::PhaseChanged {
            from: change.from,
            to: change.to,
            at: change.at,
        });
        if change.to == Phase::End {
            self.finish(change.at);
        }
    }

    fn finish(&mut self, at: Instant) {
        log::info!(
            "Game over! Winners: {:?} Eliminated: {:?}",
            self.results.winners,
            self.results.eliminated
        );
        self.events.emit(GameEvent::GameOver {
            winners: self.results.winners.clone(),
            eliminated: self.results.eliminated.clone(),
            at,
        });
    }

    fn apply_detections(&mut self, boxes: &[BoundingBox], now: Instant) {
        let before: BTreeMap<PlayerId, bool> = self
            .roster
            .iter()
            .map(|p| (p.id, p.is_eliminated()))
            .collect();

        let roster = std::mem::take(&mut self.roster);
        self.roster = self.tracker.track(boxes, roster, self.phase.phase(), now);

        let removed: Vec<PlayerId> = before
            .keys()
            .filter(|id| !self.roster.contains(**id))
            .copied()
            .collect();
        for id in removed {
            self.faces.remove(&id);
            self.events.emit(GameEvent::PlayerRemoved { id, at: now });
        }

        let mut joined = Vec::new();
        let mut eliminated = Vec::new();
        for player in self.roster.iter() {
            match before.get(&player.id) {
                None => joined.push((player.id, player.bbox)),
                Some(false) if player.is_eliminated() => eliminated.push(player.id),
                _ => {}
            }
        }
        for (id, bbox) in joined {
            log::info!("Player {} joined", id);
            self.events.emit(GameEvent::PlayerJoined { id, bbox, at: now });
        }
        for id in eliminated {
            self.record_elimination(id, now);
        }
    }

    fn record_elimination(&mut self, id: PlayerId, now: Instant) {
        log::info!("Player {} eliminated", id);
        self.results.eliminated.push(id);
        self.events.emit(GameEvent::PlayerEliminated { id, at: now });
    }

    /// Apply an external command at the current time
    pub fn handle_command(&mut self, command: Command) -> Flow {
        let now = self.clock.now();
        self.handle_command_at(command, now)
    }

    /// Apply an external command at `now`; `Flow::Stop` asks the loop to quit
    pub fn handle_command_at(&mut self, command: Command, now: Instant) -> Flow {
        match command {
            Command::Quit => {
                log::info!("Quit requested");
                return Flow::Stop;
            }
            Command::Restart => self.restart(now),
            Command::ForceEnd => {
                log::info!("Forcing end of game");
                if let Some(change) = self.phase.force_end(now) {
                    self.on_phase_change(change);
                }
            }
            Command::FacesRead => {
                if let Some(change) = self.phase.faces_read(now) {
                    self.on_phase_change(change);
                }
            }
        }
        Flow::Continue
    }

    /// Empty the roster and return to the initial phase. The background
    /// model survives, so detection needs no warm-up frame.
    pub fn restart(&mut self, now: Instant) {
        self.roster = Roster::new();
        self.faces.clear();
        self.results = GameResults::default();
        self.phase.reset(now);
        log::info!("Game restarted in {}", self.phase.phase());
        self.events.emit(GameEvent::Restarted {
            phase: self.phase.phase(),
            at: now,
        });
    }

    /// Register the reference face of a tracked player; false if unknown
    pub fn attach_face(&mut self, id: PlayerId, face: &GrayImage) -> bool {
        if !self.roster.contains(id) {
            log::debug!("Ignoring face for unknown player {}", id);
            return false;
        }
        self.faces
            .insert(id, FaceFilter::new(face, self.config.faces.clone()));
        true
    }

    /// Feed the latest face observation of a player at the current time
    pub fn observe_face(&mut self, id: PlayerId, face: Option<&GrayImage>, face_size: u32) {
        let now = self.clock.now();
        self.observe_face_at(id, face, face_size, now);
    }

    /// Update a player's face size and movement score.
    ///
    /// Movement is only scored on red lights: a player whose face keeps
    /// changing for enough consecutive red frames is eliminated. A live player
    /// whose face has grown to the winning size during green or red wins and
    /// leaves the roster.
    pub fn observe_face_at(
        &mut self,
        id: PlayerId,
        face: Option<&GrayImage>,
        face_size: u32,
        now: Instant,
    ) {
        let phase = self.phase.phase();
        if !matches!(phase, Phase::Green | Phase::Red) {
            return;
        }
        let alive = self.roster.get(id).is_some_and(|p| !p.is_eliminated());
        let Some(filter) = self.faces.get_mut(&id) else {
            return;
        };
        if !alive {
            return;
        }

        filter.update_face_size(face_size);
        let moving = match face {
            Some(face) if phase == Phase::Red => filter.is_moving(face),
            _ => false,
        };
        let won = filter.is_won();

        if phase == Phase::Red && moving {
            if self.roster.eliminate(id, now) {
                self.record_elimination(id, now);
            }
        } else if won {
            self.roster.remove(id);
            self.faces.remove(&id);
            self.results.winners.push(id);
            log::info!("Player {} wins", id);
            self.events.emit(GameEvent::PlayerWon { id, at: now });
        }
    }

    /// Read-only view for the renderer at the current time
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// Read-only view at `now`
    pub fn snapshot_at(&self, now: Instant) -> GameSnapshot {
        GameSnapshot::capture(
            self.phase.phase(),
            self.phase.remaining(now),
            &self.roster,
            self.config.tracker.grace(),
            now,
        )
    }
}
