use std::path::Path;

use crate::ai::session::TrainingSession;
use crate::checkpoint::CheckpointHyperparameters;
use crate::error::CheckpointError;
use crate::game::{Action, Board, Position};

/// Read-only view of the engine state handed to an agent each tick.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub board: &'a Board,
    pub position: Position,
    pub score: u32,
}

/// Universal interface between the game engine and a decision policy.
pub trait Agent {
    /// Choose a horizontal move for the current tick.
    ///
    /// Must not block; an agent that cannot answer in time returns
    /// [`Action::STAY`].
    fn decide(&mut self, observation: &Observation<'_>) -> Action;

    /// Called once when the controlled entity collides.
    fn on_terminal(&mut self, _observation: &Observation<'_>) {}

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

impl<A: Agent + ?Sized> Agent for &mut A {
    fn decide(&mut self, observation: &Observation<'_>) -> Action {
        (**self).decide(observation)
    }

    fn on_terminal(&mut self, observation: &Observation<'_>) {
        (**self).on_terminal(observation)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Exploration state saved by [`LearningAgent::enter_eval_mode`].
pub struct EvalState {
    pub(crate) was_frozen: bool,
}

/// Extension trait for agents that learn across episodes.
pub trait LearningAgent: Agent {
    /// Short algorithm tag used in logs and checkpoints ("Q", "TD", "MC").
    fn algorithm_name(&self) -> &str;

    /// Episode counters and score history.
    fn session(&self) -> &TrainingSession;

    fn session_mut(&mut self) -> &mut TrainingSession;

    /// Completed episodes so far.
    fn episode_count(&self) -> usize {
        self.session().episodes()
    }

    /// Current explore probability (ignoring per-state visit gating).
    fn explore_rate(&self) -> f64 {
        self.session().explore_rate()
    }

    /// Current decayed learning rate.
    fn learning_rate(&self) -> f64 {
        self.session().learning_rate()
    }

    /// Disable exploration and learning. Returns state to restore.
    fn enter_eval_mode(&mut self) -> EvalState {
        let was_frozen = self.session().is_frozen();
        self.abandon_episode();
        self.session_mut().set_frozen(true);
        EvalState { was_frozen }
    }

    /// Exit eval mode, restoring previous state.
    fn exit_eval_mode(&mut self, state: EvalState) {
        self.abandon_episode();
        self.session_mut().set_frozen(state.was_frozen);
    }

    /// Drop the unfinished episode without learning from it.
    fn abandon_episode(&mut self);

    /// Block until any background training has been applied.
    fn finish_pending(&mut self) {}

    /// Save value-function parameters to a directory.
    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), CheckpointError>;

    /// Load value-function parameters from a directory.
    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError>;

    /// Serialize session counters to JSON.
    fn training_state_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self.session().state())?)
    }

    /// Restore session counters from JSON.
    fn restore_training_state_json(&mut self, json: &str) -> Result<(), CheckpointError> {
        let state = serde_json::from_str(json)?;
        self.session_mut().restore(state);
        Ok(())
    }

    /// Hyperparameters recorded in checkpoint metadata.
    fn hyperparameters(&self) -> CheckpointHyperparameters {
        let config = self.session().config();
        CheckpointHyperparameters {
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            explore_rate: config.explore_rate,
            glie: config.glie,
            batch_size: config.batch_size,
            num_train_episodes: config.num_train_episodes,
            n_eps: config.n_eps,
        }
    }
}
