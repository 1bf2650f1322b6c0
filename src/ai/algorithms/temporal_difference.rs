use std::path::Path;

use rand::rngs::StdRng;

use super::{agent_rng, choose_action, LastStep};
use crate::ai::agent::{Agent, LearningAgent, Observation};
use crate::ai::networks::{ValueMlpConfig, ValueNetwork};
use crate::ai::session::{LearnerConfig, TrainingSession};
use crate::ai::state_encoding::{encode_board, input_size};
use crate::ai::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::Action;

/// Options for the value-network TD learner.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TemporalDifferenceConfig {
    pub hidden_size: usize,
    pub terminal_reward: f32,
    /// Reward per point of score gained between decisions.
    pub reward_scale: f32,
}

impl Default for TemporalDifferenceConfig {
    fn default() -> Self {
        TemporalDifferenceConfig {
            hidden_size: 5,
            terminal_reward: -10.0,
            reward_scale: 10.0,
        }
    }
}

/// One-step TD learner backed by a gradient-trained value network.
pub struct TemporalDifferenceAgent {
    network: ValueNetwork,
    session: TrainingSession,
    config: TemporalDifferenceConfig,
    last: Option<LastStep<Vec<f32>>>,
    rng: StdRng,
}

impl TemporalDifferenceAgent {
    /// Create an agent for boards of `rows × cols`.
    pub fn new(
        learner: LearnerConfig,
        config: TemporalDifferenceConfig,
        rows: usize,
        cols: usize,
    ) -> Self {
        let rng = agent_rng(learner.seed);
        let network = ValueNetwork::new(
            ValueMlpConfig::new(input_size(rows, cols)).with_hidden_size(config.hidden_size),
        );
        TemporalDifferenceAgent {
            network,
            session: TrainingSession::new(learner),
            config,
            last: None,
            rng,
        }
    }

    pub fn network(&self) -> &ValueNetwork {
        &self.network
    }

    fn update(&mut self, last: LastStep<Vec<f32>>, target: f32) -> f32 {
        let rate = self.session.learning_rate();
        self.network.train(
            &[ValueTarget {
                state: last.state,
                action: last.action,
                target,
            }],
            rate,
        )
    }
}

impl Agent for TemporalDifferenceAgent {
    fn decide(&mut self, observation: &Observation<'_>) -> Action {
        let state = encode_board(observation.board);

        if self.session.is_learning() {
            if let Some(last) = self.last.take() {
                let gained = observation.score.saturating_sub(last.score);
                let reward = self.config.reward_scale * gained as f32;
                let gamma = self.session.config().discount_factor as f32;
                let target = reward + gamma * self.network.max_value(&state);
                self.update(last, target);
            }
        }

        let explore = self.session.explore_rate();
        let action = choose_action(&self.network, &state, explore, &mut self.rng);

        if self.session.is_learning() {
            self.last = Some(LastStep {
                state,
                action,
                score: observation.score,
            });
        }
        action
    }

    fn on_terminal(&mut self, observation: &Observation<'_>) {
        if self.session.is_learning() {
            if let Some(last) = self.last.take() {
                let loss = self.update(last, self.config.terminal_reward);
                tracing::trace!(loss, "terminal update");
            }
        }
        self.last = None;
        self.session.finish_episode("TD", observation.score);
    }

    fn name(&self) -> &str {
        "Temporal-Difference"
    }
}

impl LearningAgent for TemporalDifferenceAgent {
    fn algorithm_name(&self) -> &str {
        "TD"
    }

    fn session(&self) -> &TrainingSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut TrainingSession {
        &mut self.session
    }

    fn abandon_episode(&mut self) {
        self.last = None;
    }

    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), CheckpointError> {
        self.network.save(dir)
    }

    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        self.network.load(dir)
    }
}
