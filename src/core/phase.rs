//! Light phases and their timing
//!
//! Phase changes are driven by an explicit transition table. The clock only
//! decides which [`Trigger`] applies at a given instant; the table decides
//! where that trigger leads, and the target phase decides the next deadline.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use super::state::Occupancy;
use crate::config::{secs, GreenTiming, TimingConfig};

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the face-capture subsystem to register players
    ReadFaces,
    /// Movement allowed
    Green,
    /// Movement eliminates
    Red,
    /// Terminal
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ReadFaces => write!(f, "READ_FACES"),
            Phase::Green => write!(f, "GREEN_LIGHT"),
            Phase::Red => write!(f, "RED_LIGHT"),
            Phase::End => write!(f, "END_GAME"),
        }
    }
}

/// Conditions that can move the game to another phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FacesRead,
    DeadlineElapsed,
    RosterEmptied,
    ForceEnd,
}

struct Transition {
    from: Phase,
    on: Trigger,
    to: Phase,
}

const TRANSITIONS: &[Transition] = &[
    Transition {
        from: Phase::ReadFaces,
        on: Trigger::FacesRead,
        to: Phase::Green,
    },
    Transition {
        from: Phase::Green,
        on: Trigger::DeadlineElapsed,
        to: Phase::Red,
    },
    Transition {
        from: Phase::Red,
        on: Trigger::DeadlineElapsed,
        to: Phase::Green,
    },
    Transition {
        from: Phase::Green,
        on: Trigger::RosterEmptied,
        to: Phase::End,
    },
    Transition {
        from: Phase::Red,
        on: Trigger::RosterEmptied,
        to: Phase::End,
    },
    Transition {
        from: Phase::ReadFaces,
        on: Trigger::ForceEnd,
        to: Phase::End,
    },
    Transition {
        from: Phase::Green,
        on: Trigger::ForceEnd,
        to: Phase::End,
    },
    Transition {
        from: Phase::Red,
        on: Trigger::ForceEnd,
        to: Phase::End,
    },
];

/// Look up the phase `trigger` leads to from `from`, if any
pub fn next_phase(from: Phase, trigger: Trigger) -> Option<Phase> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.on == trigger)
        .map(|t| t.to)
}

/// A phase change that has happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
    pub trigger: Trigger,
    pub at: Instant,
}

/// Tracks the active phase and when it ends
pub struct PhaseClock {
    phase: Phase,
    initial: Phase,
    deadline: Option<Instant>,
    red: Duration,
    green: GreenTiming,
    rng: Box<dyn RngCore + Send>,
}

impl PhaseClock {
    /// Start in the initial phase given by `timing`, with its deadline
    /// measured from `now`
    pub fn new(timing: &TimingConfig, rng: Box<dyn RngCore + Send>, now: Instant) -> Self {
        let initial = if timing.read_faces {
            Phase::ReadFaces
        } else {
            Phase::Green
        };
        let mut clock = Self {
            phase: initial,
            initial,
            deadline: None,
            red: timing.red(),
            green: timing.green,
            rng,
        };
        clock.deadline = clock.deadline_for(initial, now);
        clock
    }

    /// The active phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// When the active phase times out; `None` for ReadFaces and End
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::End
    }

    /// Time left until the next scheduled transition
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Evaluate time and roster conditions and transition if one applies
    pub fn advance(&mut self, now: Instant, occupancy: Occupancy) -> Option<PhaseChange> {
        let trigger = self.pending_trigger(now, occupancy)?;
        self.fire(trigger, now)
    }

    fn pending_trigger(&self, now: Instant, occupancy: Occupancy) -> Option<Trigger> {
        let elapsed = self.deadline.is_some_and(|d| now >= d);
        match (self.phase, occupancy) {
            (Phase::Green | Phase::Red, Occupancy::Emptied) => Some(Trigger::RosterEmptied),
            (Phase::Green, Occupancy::Waiting) if elapsed => Some(Trigger::RosterEmptied),
            (Phase::Green | Phase::Red, _) if elapsed => Some(Trigger::DeadlineElapsed),
            _ => None,
        }
    }

    /// Apply `trigger`; `None` if the table has no entry for the current phase
    pub fn fire(&mut self, trigger: Trigger, now: Instant) -> Option<PhaseChange> {
        let to = next_phase(self.phase, trigger)?;
        let change = PhaseChange {
            from: self.phase,
            to,
            trigger,
            at: now,
        };
        self.enter(to, now);
        log::info!("Phase {} -> {} ({:?})", change.from, change.to, trigger);
        Some(change)
    }

    /// Jump straight to End
    pub fn force_end(&mut self, now: Instant) -> Option<PhaseChange> {
        self.fire(Trigger::ForceEnd, now)
    }

    /// Leave ReadFaces once the players are registered
    pub fn faces_read(&mut self, now: Instant) -> Option<PhaseChange> {
        self.fire(Trigger::FacesRead, now)
    }

    /// Back to the initial phase with a fresh deadline
    pub fn reset(&mut self, now: Instant) {
        self.enter(self.initial, now);
    }

    fn enter(&mut self, phase: Phase, now: Instant) {
        self.phase = phase;
        self.deadline = self.deadline_for(phase, now);
    }

    fn deadline_for(&mut self, phase: Phase, now: Instant) -> Option<Instant> {
        match phase {
            Phase::Green => Some(now + self.green_duration()),
            Phase::Red => Some(now + self.red),
            Phase::ReadFaces | Phase::End => None,
        }
    }

    fn green_duration(&mut self) -> Duration {
        match self.green {
            GreenTiming::Fixed { secs: s } => secs(s),
            GreenTiming::Random {
                min_secs,
                range_secs,
            } => {
                let max_secs = min_secs + range_secs;
                // a range too small to widen `min_secs` in f64 is empty
                if max_secs > min_secs {
                    secs(self.rng.gen_range(min_secs..max_secs))
                } else {
                    secs(min_secs)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_timing() -> TimingConfig {
        TimingConfig {
            red_secs: 5.0,
            green: GreenTiming::Fixed { secs: 4.0 },
            read_faces: false,
        }
    }

    fn clock(timing: &TimingConfig, now: Instant) -> PhaseClock {
        PhaseClock::new(timing, Box::new(StdRng::seed_from_u64(7)), now)
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(next_phase(Phase::Green, Trigger::DeadlineElapsed), Some(Phase::Red));
        assert_eq!(next_phase(Phase::Red, Trigger::DeadlineElapsed), Some(Phase::Green));
        assert_eq!(next_phase(Phase::Red, Trigger::RosterEmptied), Some(Phase::End));
        assert_eq!(next_phase(Phase::ReadFaces, Trigger::FacesRead), Some(Phase::Green));
        assert_eq!(next_phase(Phase::Green, Trigger::FacesRead), None);
        assert_eq!(next_phase(Phase::ReadFaces, Trigger::DeadlineElapsed), None);
        for trigger in [
            Trigger::FacesRead,
            Trigger::DeadlineElapsed,
            Trigger::RosterEmptied,
            Trigger::ForceEnd,
        ] {
            assert_eq!(next_phase(Phase::End, trigger), None);
        }
    }

    #[test]
    fn test_initial_green_deadline() {
        let t0 = Instant::now();
        let clock = clock(&fixed_timing(), t0);
        assert_eq!(clock.phase(), Phase::Green);
        assert_eq!(clock.deadline(), Some(t0 + Duration::from_secs(4)));
        assert_eq!(clock.remaining(t0 + Duration::from_secs(1)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_green_waits_for_deadline() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        let before = t0 + Duration::from_millis(3999);
        assert_eq!(clock.advance(before, Occupancy::Occupied), None);
        assert_eq!(clock.phase(), Phase::Green);
    }

    #[test]
    fn test_green_to_red_with_players() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        let t1 = t0 + Duration::from_secs(4);

        let change = clock.advance(t1, Occupancy::Occupied).unwrap();
        assert_eq!((change.from, change.to), (Phase::Green, Phase::Red));
        assert_eq!(change.trigger, Trigger::DeadlineElapsed);
        assert_eq!(clock.deadline(), Some(t1 + Duration::from_secs(5)));
    }

    #[test]
    fn test_green_deadline_without_players_ends() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        let change = clock
            .advance(t0 + Duration::from_secs(4), Occupancy::Waiting)
            .unwrap();
        assert_eq!(change.to, Phase::End);
        assert_eq!(clock.deadline(), None);
    }

    #[test]
    fn test_waiting_before_deadline_stays_green() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        assert_eq!(clock.advance(t0 + Duration::from_secs(1), Occupancy::Waiting), None);
    }

    #[test]
    fn test_emptied_roster_ends_immediately() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        clock.advance(t0 + Duration::from_secs(4), Occupancy::Occupied);
        assert_eq!(clock.phase(), Phase::Red);

        let change = clock
            .advance(t0 + Duration::from_secs(5), Occupancy::Emptied)
            .unwrap();
        assert_eq!(change.to, Phase::End);
        assert_eq!(change.trigger, Trigger::RosterEmptied);
    }

    #[test]
    fn test_red_duration_fixed() {
        let t0 = Instant::now();
        let timing = TimingConfig::default();
        for seed in 0..5 {
            let mut clock = PhaseClock::new(&timing, Box::new(StdRng::seed_from_u64(seed)), t0);
            let deadline = clock.deadline().unwrap();
            clock.advance(deadline, Occupancy::Occupied);
            assert_eq!(clock.phase(), Phase::Red);
            assert_eq!(clock.remaining(deadline), Some(Duration::from_secs(5)));
        }
    }

    #[test]
    fn test_random_green_in_range() {
        let t0 = Instant::now();
        let timing = TimingConfig {
            red_secs: 1.0,
            green: GreenTiming::Random {
                min_secs: 2.0,
                range_secs: 3.0,
            },
            read_faces: false,
        };
        let mut clock = PhaseClock::new(&timing, Box::new(StdRng::seed_from_u64(42)), t0);
        let mut now = t0;
        let mut distinct = std::collections::HashSet::new();

        for _ in 0..200 {
            let green = clock.remaining(now).unwrap();
            assert!(green >= Duration::from_secs(2), "{:?}", green);
            assert!(green < Duration::from_secs(5), "{:?}", green);
            distinct.insert(green);

            now = clock.deadline().unwrap();
            clock.advance(now, Occupancy::Occupied); // to red
            now = clock.deadline().unwrap();
            clock.advance(now, Occupancy::Occupied); // back to green
            assert_eq!(clock.phase(), Phase::Green);
        }
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_zero_range_uses_minimum() {
        let t0 = Instant::now();
        let timing = TimingConfig {
            red_secs: 1.0,
            green: GreenTiming::Random {
                min_secs: 2.0,
                range_secs: 0.0,
            },
            read_faces: false,
        };
        let clock = PhaseClock::new(&timing, Box::new(StdRng::seed_from_u64(1)), t0);
        assert_eq!(clock.remaining(t0), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_range_lost_to_rounding_uses_minimum() {
        let t0 = Instant::now();
        let timing = TimingConfig {
            red_secs: 1.0,
            green: GreenTiming::Random {
                min_secs: 3.0,
                range_secs: 1e-20,
            },
            read_faces: false,
        };
        let clock = PhaseClock::new(&timing, Box::new(StdRng::seed_from_u64(1)), t0);
        assert_eq!(clock.phase(), Phase::Green);
        assert_eq!(clock.remaining(t0), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_end_is_terminal() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        assert!(clock.force_end(t0).is_some());
        assert!(clock.is_over());

        let later = t0 + Duration::from_secs(100);
        assert_eq!(clock.advance(later, Occupancy::Occupied), None);
        assert_eq!(clock.force_end(later), None);
        assert_eq!(clock.phase(), Phase::End);
    }

    #[test]
    fn test_read_faces_start() {
        let t0 = Instant::now();
        let timing = TimingConfig {
            read_faces: true,
            ..fixed_timing()
        };
        let mut clock = clock(&timing, t0);
        assert_eq!(clock.phase(), Phase::ReadFaces);
        assert_eq!(clock.deadline(), None);
        assert_eq!(clock.advance(t0 + Duration::from_secs(60), Occupancy::Waiting), None);

        let t1 = t0 + Duration::from_secs(2);
        clock.faces_read(t1).unwrap();
        assert_eq!(clock.phase(), Phase::Green);
        assert_eq!(clock.deadline(), Some(t1 + Duration::from_secs(4)));
    }

    #[test]
    fn test_reset_restores_initial() {
        let t0 = Instant::now();
        let mut clock = clock(&fixed_timing(), t0);
        clock.force_end(t0);

        let t1 = t0 + Duration::from_secs(30);
        clock.reset(t1);
        assert_eq!(clock.phase(), Phase::Green);
        assert_eq!(clock.deadline(), Some(t1 + Duration::from_secs(4)));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Green.to_string(), "GREEN_LIGHT");
        assert_eq!(Phase::End.to_string(), "END_GAME");
    }
}
