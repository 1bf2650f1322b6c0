use std::path::Path;
use std::thread::JoinHandle;

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{agent_rng, choose_action, LastStep};
use crate::ai::agent::{Agent, LearningAgent, Observation};
use crate::ai::networks::{EvolutionConfig, EvolvedNetwork};
use crate::ai::session::{LearnerConfig, TrainingSession};
use crate::ai::state_encoding::{encode_board, input_size};
use crate::ai::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::Action;
use crate::training::replay_buffer::ReplayBuffer;

/// Options for the episodic Monte-Carlo learner.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub hidden_size: usize,
    pub replay_capacity: usize,
    pub generations: usize,
    pub offspring: usize,
    pub terminal_reward: f32,
    pub reward_scale: f32,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            hidden_size: 8,
            replay_capacity: 100,
            generations: 100,
            offspring: 8,
            terminal_reward: -10.0,
            reward_scale: 10.0,
        }
    }
}

/// One step of an episode trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: Action,
    pub reward: f32,
}

/// Discounted return of every step, computed back to front.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; rewards.len()];
    let mut cumulative = 0.0;
    for (idx, &reward) in rewards.iter().enumerate().rev() {
        cumulative = reward + gamma * cumulative;
        returns[idx] = cumulative;
    }
    returns
}

/// Replay subsample size: `min(ceil(|N(1, len)|), len)`, at least 1.
pub fn replay_sample_size<R: Rng>(len: usize, rng: &mut R) -> usize {
    if len == 0 {
        return 0;
    }
    let draw = match Normal::new(1.0, len as f64) {
        Ok(normal) => normal.sample(rng),
        Err(_) => 1.0,
    };
    (draw.abs().ceil() as usize).clamp(1, len)
}

/// Evolution pass running on a worker thread.
struct PendingTraining {
    handle: JoinHandle<(EvolvedNetwork, f32)>,
    /// Final score of the episode being learned from.
    score: u32,
}

/// Learns from full-episode returns with experience replay. Training runs
/// in the background after each episode; until it lands, the agent holds
/// still and leaves its value function alone. An episode that overlaps
/// training is neither learned from nor counted.
pub struct MonteCarloAgent {
    network: EvolvedNetwork,
    replay: ReplayBuffer<ValueTarget<Vec<f32>>>,
    trace: Vec<Experience>,
    last: Option<LastStep<Vec<f32>>>,
    pending: Option<PendingTraining>,
    /// The current episode made a decision while training was pending.
    overlapped: bool,
    session: TrainingSession,
    config: MonteCarloConfig,
    rng: StdRng,
}

impl MonteCarloAgent {
    /// Create an agent for boards of `rows × cols`.
    pub fn new(
        learner: LearnerConfig,
        config: MonteCarloConfig,
        rows: usize,
        cols: usize,
    ) -> Self {
        let mut rng = agent_rng(learner.seed);
        let evolution = EvolutionConfig {
            generations: config.generations,
            offspring: config.offspring,
        };
        let network = EvolvedNetwork::new(
            input_size(rows, cols),
            config.hidden_size,
            evolution,
            Some(rng.random()),
        );
        MonteCarloAgent {
            network,
            replay: ReplayBuffer::new(config.replay_capacity.max(1)),
            trace: Vec::new(),
            last: None,
            pending: None,
            overlapped: false,
            session: TrainingSession::new(learner),
            config,
            rng,
        }
    }

    pub fn network(&self) -> &EvolvedNetwork {
        &self.network
    }

    pub fn replay(&self) -> &ReplayBuffer<ValueTarget<Vec<f32>>> {
        &self.replay
    }

    pub fn is_training(&self) -> bool {
        self.pending.is_some()
    }

    /// Push the finished trace into replay and start an evolution pass.
    fn start_training(&mut self, score: u32) {
        let trace = std::mem::take(&mut self.trace);
        let gamma = self.session.config().discount_factor as f32;
        let rewards: Vec<f32> = trace.iter().map(|step| step.reward).collect();
        let returns = discounted_returns(&rewards, gamma);
        // Newest-first, matching the order the returns are accumulated in.
        for (step, target) in trace.into_iter().zip(returns).rev() {
            self.replay.push(ValueTarget {
                state: step.state,
                action: step.action,
                target,
            });
        }

        let size = replay_sample_size(self.replay.len(), &mut self.rng);
        let batch = self.replay.sample(size, &mut self.rng);
        let rate = self.session.learning_rate();
        let mut trainee = self.network.clone();

        let spawned = std::thread::Builder::new()
            .name("mc-evolution".into())
            .spawn(move || {
                let error = trainee.train(&batch, rate);
                (trainee, error)
            });
        match spawned {
            Ok(handle) => self.pending = Some(PendingTraining { handle, score }),
            Err(e) => {
                tracing::warn!(error = %e, "could not start training thread; skipping update");
                self.session.finish_episode("MC", score);
            }
        }
    }

    /// Swap in the trained network and close the episode it came from.
    fn complete(&mut self, pending: PendingTraining) {
        match pending.handle.join() {
            Ok((network, error)) => {
                tracing::debug!(error, replay = self.replay.len(), "evolved network installed");
                self.network = network;
            }
            Err(_) => tracing::error!("training thread panicked; keeping previous weights"),
        }
        self.last = None;
        self.trace.clear();
        self.session.finish_episode("MC", pending.score);
    }

    /// Returns true when no training is outstanding.
    fn poll_pending(&mut self) -> bool {
        match &self.pending {
            Some(pending) if !pending.handle.is_finished() => false,
            Some(_) => {
                if let Some(pending) = self.pending.take() {
                    self.complete(pending);
                }
                true
            }
            None => true,
        }
    }
}

impl Agent for MonteCarloAgent {
    fn decide(&mut self, observation: &Observation<'_>) -> Action {
        if !self.poll_pending() {
            self.overlapped = true;
            return Action::STAY;
        }

        let state = encode_board(observation.board);
        let recording = self.session.is_learning() && !self.overlapped;

        if recording {
            if let Some(last) = self.last.take() {
                let gained = observation.score.saturating_sub(last.score);
                self.trace.push(Experience {
                    state: last.state,
                    action: last.action,
                    reward: self.config.reward_scale * gained as f32,
                });
            }
        }

        let explore = self.session.explore_rate();
        let action = choose_action(&self.network, &state, explore, &mut self.rng);

        if recording {
            self.last = Some(LastStep {
                state,
                action,
                score: observation.score,
            });
        }
        action
    }

    fn on_terminal(&mut self, observation: &Observation<'_>) {
        let idle = self.poll_pending();
        if !idle || self.overlapped {
            tracing::debug!(score = observation.score, "episode overlapped training; ignored");
            self.overlapped = false;
            self.last = None;
            self.trace.clear();
            return;
        }

        match self.last.take() {
            Some(last) if self.session.is_learning() => {
                self.trace.push(Experience {
                    state: last.state,
                    action: last.action,
                    reward: self.config.terminal_reward,
                });
                self.start_training(observation.score);
            }
            _ => {
                self.trace.clear();
                self.session.finish_episode("MC", observation.score);
            }
        }
    }

    fn name(&self) -> &str {
        "Monte-Carlo"
    }
}

impl LearningAgent for MonteCarloAgent {
    fn algorithm_name(&self) -> &str {
        "MC"
    }

    fn session(&self) -> &TrainingSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut TrainingSession {
        &mut self.session
    }

    /// Completes any outstanding training first.
    fn abandon_episode(&mut self) {
        self.finish_pending();
        self.overlapped = false;
        self.last = None;
        self.trace.clear();
    }

    fn finish_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.complete(pending);
        }
    }

    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), CheckpointError> {
        self.network.save(dir)
    }

    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        self.network.load(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, EngineConfig, GameEngine};
    use rand::SeedableRng;
    use std::sync::mpsc;

    fn learner() -> LearnerConfig {
        LearnerConfig {
            learning_rate: 0.1,
            discount_factor: 0.5,
            explore_rate: 0.0,
            seed: Some(9),
            ..Default::default()
        }
    }

    fn small() -> MonteCarloConfig {
        MonteCarloConfig {
            hidden_size: 4,
            generations: 5,
            offspring: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_discounted_returns() {
        let returns = discounted_returns(&[10.0, 0.0, -10.0], 0.5);
        assert_eq!(returns, vec![7.5, -5.0, -10.0]);
        assert!(discounted_returns(&[], 0.9).is_empty());
    }

    #[test]
    fn test_replay_sample_size_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        assert_eq!(replay_sample_size(0, &mut rng), 0);
        assert_eq!(replay_sample_size(1, &mut rng), 1);
        for len in [2, 10, 100] {
            for _ in 0..200 {
                let size = replay_sample_size(len, &mut rng);
                assert!((1..=len).contains(&size));
            }
        }
    }

    #[test]
    fn test_stays_put_while_training() {
        let mut agent = MonteCarloAgent::new(learner(), small(), 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let observation = Observation {
            board: &board,
            position: spawn,
            score: 0,
        };

        let (release, wait) = mpsc::channel::<()>();
        let network = agent.network().clone();
        let handle = std::thread::spawn(move || {
            wait.recv().ok();
            (network, 0.0)
        });
        agent.pending = Some(PendingTraining { handle, score: 3 });

        assert!(agent.is_training());
        assert_eq!(agent.decide(&observation), Action::STAY);
        assert!(agent.last.is_none());
        assert_eq!(agent.episode_count(), 0);

        release.send(()).unwrap();
        agent.finish_pending();
        assert!(!agent.is_training());
        assert_eq!(agent.episode_count(), 1);
    }

    #[test]
    fn test_episode_overlapping_training_is_not_counted() {
        let config = LearnerConfig {
            batch_size: Some(10),
            ..learner()
        };
        let mut agent = MonteCarloAgent::new(config, small(), 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let at = |score| Observation {
            board: &board,
            position: spawn,
            score,
        };

        let (release, wait) = mpsc::channel::<()>();
        let network = agent.network().clone();
        let handle = std::thread::spawn(move || {
            wait.recv().ok();
            (network, 0.0)
        });
        agent.pending = Some(PendingTraining { handle, score: 3 });
        assert_eq!(agent.decide(&at(0)), Action::STAY);

        // The worker lands before the collision is reported.
        release.send(()).unwrap();
        while !agent.pending.as_ref().unwrap().handle.is_finished() {
            std::thread::yield_now();
        }
        agent.on_terminal(&at(7));

        assert!(!agent.is_training());
        assert_eq!(agent.episode_count(), 1);
        assert_eq!(agent.session().state().batch_scores, vec![3]);

        // The next episode learns and counts as usual.
        agent.decide(&at(0));
        agent.decide(&at(2));
        agent.on_terminal(&at(2));
        agent.finish_pending();
        assert_eq!(agent.episode_count(), 2);
        assert_eq!(agent.session().state().batch_scores, vec![3, 2]);
        assert_eq!(agent.replay().len(), 2);
    }

    #[test]
    fn test_decisions_after_training_lands_are_not_recorded() {
        let mut agent = MonteCarloAgent::new(learner(), small(), 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let at = |score| Observation {
            board: &board,
            position: spawn,
            score,
        };

        let network = agent.network().clone();
        let handle = std::thread::spawn(move || (network, 0.0));
        agent.pending = Some(PendingTraining { handle, score: 1 });
        agent.overlapped = true;
        while !agent.pending.as_ref().unwrap().handle.is_finished() {
            std::thread::yield_now();
        }

        agent.decide(&at(0));
        assert!(agent.last.is_none());
        assert_eq!(agent.episode_count(), 1);
        agent.on_terminal(&at(4));
        assert_eq!(agent.episode_count(), 1);
        assert!(agent.replay().is_empty());
    }

    #[test]
    fn test_terminal_fills_replay_and_trains() {
        let mut agent = MonteCarloAgent::new(learner(), small(), 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let at = |score| Observation {
            board: &board,
            position: spawn,
            score,
        };

        agent.decide(&at(0));
        agent.decide(&at(1));
        agent.decide(&at(1));
        agent.on_terminal(&at(1));
        agent.finish_pending();

        assert_eq!(agent.replay().len(), 3);
        let targets: Vec<f32> = agent.replay().iter().map(|t| t.target).collect();
        // Rewards [10, 0, -10] with γ = 0.5, pushed newest first.
        assert_eq!(targets, vec![-10.0, -5.0, 7.5]);
        assert_eq!(agent.episode_count(), 1);
    }

    #[test]
    fn test_replay_is_bounded() {
        let config = MonteCarloConfig {
            replay_capacity: 4,
            ..small()
        };
        let mut agent = MonteCarloAgent::new(learner(), config, 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let at = |score| Observation {
            board: &board,
            position: spawn,
            score,
        };
        for _ in 0..3 {
            agent.decide(&at(0));
            agent.decide(&at(0));
            agent.on_terminal(&at(0));
            agent.finish_pending();
        }
        assert_eq!(agent.replay().len(), 4);
        assert_eq!(agent.episode_count(), 3);
    }

    #[test]
    fn test_frozen_agent_does_not_train() {
        let mut agent = MonteCarloAgent::new(learner(), small(), 3, 3);
        let (board, spawn) = Board::with_spawn(3, 3);
        let observation = Observation {
            board: &board,
            position: spawn,
            score: 0,
        };
        let eval = agent.enter_eval_mode();
        agent.decide(&observation);
        agent.on_terminal(&observation);
        assert!(!agent.is_training());
        assert!(agent.replay().is_empty());
        agent.exit_eval_mode(eval);
        assert_eq!(agent.episode_count(), 0);
    }

    #[test]
    fn test_plays_episodes_in_engine() {
        let mut agent = MonteCarloAgent::new(
            LearnerConfig {
                explore_rate: 0.3,
                ..learner()
            },
            small(),
            5,
            4,
        );
        let mut finished = 0;
        for seed in 0..3 {
            let mut engine = GameEngine::new(EngineConfig {
                rows: 5,
                cols: 4,
                density: 0.6,
                seed: Some(seed),
                ..Default::default()
            });
            let outcome = engine.run_episode(Some(&mut agent), Some(5_000));
            if outcome.collided {
                finished += 1;
            }
            agent.abandon_episode();
        }
        assert!(agent.episode_count() <= finished);
        assert!(!agent.is_training());
    }
}
