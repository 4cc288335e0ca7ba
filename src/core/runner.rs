//! Frame loop driving a [`GameController`] from a [`FrameSource`]

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

use super::controller::{Command, Flow, GameController};
use super::snapshot::{GameResults, GameSnapshot};
use crate::vision::FrameSource;
use crate::Result;

/// Owns a frame source and a controller and runs them until the game ends
pub struct GameRunner<S: FrameSource> {
    source: S,
    controller: GameController,
    /// Commands from the input layer, applied between frames
    commands: Receiver<Command>,
    frame_count: u64,
}

impl<S: FrameSource> GameRunner<S> {
    /// Create a runner; nothing is read until [`GameRunner::run`]
    pub fn new(source: S, controller: GameController, commands: Receiver<Command>) -> Self {
        Self {
            source,
            controller,
            commands,
            frame_count: 0,
        }
    }

    /// The game being driven
    pub fn controller(&self) -> &GameController {
        &self.controller
    }

    /// Mutable access, e.g. to register event listeners or faces
    pub fn controller_mut(&mut self) -> &mut GameController {
        &mut self.controller
    }

    /// Frames read from the source so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run until the game ends or a quit command arrives.
    ///
    /// `render` is called with a snapshot after every processed frame. A
    /// frame source failure stops the loop and is returned.
    pub fn run<F>(&mut self, mut render: F) -> Result<GameResults>
    where
        F: FnMut(&GameSnapshot),
    {
        log::info!("Game loop started");
        let mut last_log = Instant::now();

        loop {
            if self.drain_commands() == Flow::Stop || self.controller.is_over() {
                break;
            }

            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Frame source failed after {} frames: {}", self.frame_count, e);
                    return Err(e);
                }
            };
            self.frame_count += 1;

            self.controller.process_frame(&frame)?;
            render(&self.controller.snapshot());

            // Log frame stats every 5 seconds
            if last_log.elapsed() >= Duration::from_secs(5) {
                let now = self.controller.now();
                let remaining = match self.controller.phase_clock().remaining(now) {
                    Some(d) => format!("{:.1}s left", d.as_secs_f64()),
                    None => "no deadline".to_string(),
                };
                log::info!(
                    "{} frames processed, {} with {}, {} active player(s)",
                    self.frame_count,
                    self.controller.phase(),
                    remaining,
                    self.controller.roster().active_count()
                );
                last_log = Instant::now();
            }

            if self.controller.is_over() {
                break;
            }
        }

        log::info!("Game loop stopped after {} frames", self.frame_count);
        Ok(self.controller.results().clone())
    }

    fn drain_commands(&mut self) -> Flow {
        let commands: Vec<Command> = self.commands.try_iter().collect();
        for command in commands {
            if self.controller.handle_command(command) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}
