//! Red Light, Green Light
//!
//! A game engine that watches a camera feed, turns frame-to-frame motion into
//! tracked players, and eliminates anyone caught moving while the light is red.
//!
//! The crate is organised in three layers:
//! - [`vision`] - frame capture boundary, region of interest, adaptive
//!   background model and the motion detector
//! - [`core`] - players and roster, the tracker, the phase clock, face
//!   bookkeeping, events, the per-frame controller and the runner loop
//! - [`config`] - TOML configuration with defaults for every tunable
//!
//! # Example
//!
//! ```ignore
//! use redlight::{GameConfig, GameController, GameRunner, FrameSequenceSource};
//!
//! let config = GameConfig::load_or_default("redlight.toml");
//! let source = FrameSequenceSource::from_directory("frames/", false, &config.frame)?;
//! let (commands, inbox) = crossbeam_channel::unbounded();
//! let mut runner = GameRunner::new(source, GameController::new(config)?, inbox);
//! let results = runner.run(|snapshot| println!("{}", snapshot.phase))?;
//! ```

pub mod config;
pub mod core;
pub mod vision;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig};
pub use core::{
    Clock, Command, Flow, GameController, GameEvent, GameResults, GameRunner, GameSnapshot,
    ManualClock, Occupancy, Phase, PhaseClock, Player, PlayerId, PlayerTracker, Roster,
    SystemClock,
};
pub use vision::{
    BackgroundModel, BoundingBox, FrameSequenceSource, FrameSource, MotionDetector, RoiMask,
};

/// Errors surfaced by the game engine
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The frame source could not deliver a frame (end of stream, device error)
    #[error("frame source failed: {0}")]
    FrameSource(String),

    /// A frame does not match the dimensions the detector was set up for
    #[error("frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSize {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, GameError>;
