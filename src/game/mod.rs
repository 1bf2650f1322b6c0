//! Core game logic: grid model, obstacle generator, and the tick-driven
//! engine state machine.

mod action;
mod board;
mod engine;
mod generator;

pub use action::{Action, ACTIONS, NUM_ACTIONS};
pub use board::{Board, Cell, Position};
pub use engine::{
    EngineConfig, EngineStatus, EpisodeOutcome, GameEngine, Snapshot, TickOutcome, FALL_INTERVAL,
};
pub use generator::{EscapeGenerator, Generation};
