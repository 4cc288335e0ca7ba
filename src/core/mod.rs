//! Game logic
//!
//! - `Roster` / `Player` - tracked players keyed by stable id
//! - `PlayerTracker` - associates motion boxes with players
//! - `PhaseClock` - green/red light timing and transitions
//! - `GameController` - per-frame orchestration and commands
//! - `GameRunner` - frame loop over a `FrameSource`

mod clock;
mod controller;
mod events;
mod faces;
mod phase;
mod runner;
mod snapshot;
mod state;
mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Command, Flow, GameController};
pub use events::{EventCallback, EventHandler, GameEvent};
pub use faces::FaceFilter;
pub use phase::{next_phase, Phase, PhaseChange, PhaseClock, Trigger};
pub use runner::GameRunner;
pub use snapshot::{GameResults, GameSnapshot, PlayerView};
pub use state::{Occupancy, Player, PlayerId, Roster};
pub use tracker::PlayerTracker;
