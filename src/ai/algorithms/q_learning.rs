use std::path::Path;

use rand::rngs::StdRng;

use super::{agent_rng, choose_action, LastStep};
use crate::ai::agent::{Agent, LearningAgent, Observation};
use crate::ai::q_table::QTable;
use crate::ai::session::{LearnerConfig, TrainingSession};
use crate::ai::state_encoding::{local_obstacle_count, StateKey};
use crate::ai::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::Action;

pub const Q_TABLE_FILE: &str = "q_table.json";

/// Tabular learner options.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Rows above the entity included in the state key and step penalty.
    pub horizon: usize,
    pub terminal_reward: f32,
    /// Penalty per obstacle near the entity, applied every step.
    pub step_penalty: f32,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            horizon: 10,
            terminal_reward: -1000.0,
            step_penalty: 0.01,
        }
    }
}

/// Q-learning over a discretized local view of the board.
pub struct QLearningAgent {
    table: QTable,
    session: TrainingSession,
    config: QLearningConfig,
    last: Option<LastStep<StateKey>>,
    rng: StdRng,
}

impl QLearningAgent {
    pub fn new(learner: LearnerConfig, config: QLearningConfig) -> Self {
        let rng = agent_rng(learner.seed);
        QLearningAgent {
            table: QTable::new(),
            session: TrainingSession::new(learner),
            config,
            last: None,
            rng,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// State key for an observation.
    pub fn state_key(&self, observation: &Observation<'_>) -> StateKey {
        StateKey::from_board(observation.board, observation.position, self.config.horizon)
    }

    fn update(&mut self, last: LastStep<StateKey>, target: f32) {
        let rate = self.session.learning_rate();
        self.table.train(
            &[ValueTarget {
                state: last.state,
                action: last.action,
                target,
            }],
            rate,
        );
    }
}

impl Agent for QLearningAgent {
    fn decide(&mut self, observation: &Observation<'_>) -> Action {
        let key = self.state_key(observation);

        if self.session.is_learning() {
            if let Some(last) = self.last.take() {
                let nearby = local_obstacle_count(
                    observation.board,
                    observation.position,
                    self.config.horizon,
                );
                let reward = -self.config.step_penalty * nearby as f32;
                let gamma = self.session.config().discount_factor as f32;
                let target = reward + gamma * self.table.max_value(&key);
                self.update(last, target);
            }
        }

        let explore = self.session.explore_rate_for_visits(self.table.visits(&key));
        let action = choose_action(&self.table, &key, explore, &mut self.rng);

        if self.session.is_learning() {
            self.table.record_visit(key);
            self.last = Some(LastStep {
                state: key,
                action,
                score: observation.score,
            });
        }
        action
    }

    fn on_terminal(&mut self, observation: &Observation<'_>) {
        if self.session.is_learning() {
            if let Some(last) = self.last.take() {
                self.update(last, self.config.terminal_reward);
            }
        }
        self.last = None;
        self.session.finish_episode("Q", observation.score);
    }

    fn name(&self) -> &str {
        "Q-Learning"
    }
}

impl LearningAgent for QLearningAgent {
    fn algorithm_name(&self) -> &str {
        "Q"
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
        self.table.save(&dir.join(Q_TABLE_FILE))
    }

    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        self.table = QTable::load(&dir.join(Q_TABLE_FILE))?;
        Ok(())
    }
}
