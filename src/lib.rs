//! # ML Block Dodge
//!
//! A falling-obstacle grid game with reinforcement learning agents. Obstacle
//! rows are generated so that at least one escape path always exists, and the
//! player is any [`ai::Agent`]: a human adapter, a random baseline, or one of
//! three learners (tabular Q-learning, a TD value network, and a Monte-Carlo
//! network trained by evolution on a background thread) built on the Burn ML
//! framework.
//!
//! ## Modules
//!
//! - [`game`] — Grid, actions, escape-guarantee generator, tick engine
//! - [`ai`] — Agent traits, exploration policy, value backends, learning agents
//! - [`training`] — Episode runner, evaluation, trainer, replay buffer, metrics
//! - [`checkpoint`] — Agent persistence and versioning
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
