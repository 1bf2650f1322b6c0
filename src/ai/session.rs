//! Per-agent episode bookkeeping shared by every learning agent.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use super::exploration::{decay, ExplorationPolicy, DECAY_RATE};

/// Options common to every learning agent.
///
/// Missing or malformed values fall back to the field's entry in
/// [`LearnerConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLearnerConfig")]
pub struct LearnerConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub explore_rate: f64,
    pub glie: bool,
    /// Episodes per statistics batch; `None` disables batch statistics.
    pub batch_size: Option<usize>,
    /// Episodes after which learning and exploration stop for good.
    pub num_train_episodes: Option<usize>,
    /// Tabular agent only: minimum visits before a state is exploited.
    pub n_eps: u32,
    pub seed: Option<u64>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            learning_rate: 0.1,
            discount_factor: 0.9,
            explore_rate: 0.0,
            glie: false,
            batch_size: None,
            num_train_episodes: None,
            n_eps: 0,
            seed: None,
        }
    }
}

impl LearnerConfig {
    pub fn exploration(&self) -> ExplorationPolicy {
        ExplorationPolicy::new(self.explore_rate, self.glie, self.n_eps)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

/// The value if present and well-formed, otherwise `default`.
fn resolve<T>(value: Option<Lenient<T>>, default: T) -> T {
    match value {
        Some(Lenient::Valid(value)) => value,
        _ => default,
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawLearnerConfig {
    learning_rate: Option<Lenient<f64>>,
    discount_factor: Option<Lenient<f64>>,
    explore_rate: Option<Lenient<f64>>,
    glie: Option<Lenient<bool>>,
    batch_size: Option<Lenient<Option<usize>>>,
    num_train_episodes: Option<Lenient<Option<usize>>>,
    n_eps: Option<Lenient<u32>>,
    seed: Option<Lenient<Option<u64>>>,
}

impl From<RawLearnerConfig> for LearnerConfig {
    fn from(raw: RawLearnerConfig) -> Self {
        let default = LearnerConfig::default();
        LearnerConfig {
            learning_rate: resolve(raw.learning_rate, default.learning_rate),
            discount_factor: resolve(raw.discount_factor, default.discount_factor),
            explore_rate: resolve(raw.explore_rate, default.explore_rate),
            glie: resolve(raw.glie, default.glie),
            batch_size: resolve(raw.batch_size, default.batch_size),
            num_train_episodes: resolve(raw.num_train_episodes, default.num_train_episodes),
            n_eps: resolve(raw.n_eps, default.n_eps),
            seed: resolve(raw.seed, default.seed),
        }
    }
}

/// Serializable counters that survive a checkpoint round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub episodes: usize,
    /// Scores of the current statistics batch.
    pub batch_scores: Vec<u32>,
}

/// Statistics emitted at the end of every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub first_episode: usize,
    pub last_episode: usize,
    pub mean_score: f64,
    pub learning_rate: f64,
    pub explore_rate: f64,
}

/// Episode counter, score history and schedules for one agent.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    config: LearnerConfig,
    policy: ExplorationPolicy,
    state: SessionState,
    frozen: bool,
}

impl TrainingSession {
    pub fn new(config: LearnerConfig) -> Self {
        let policy = config.exploration();
        TrainingSession {
            config,
            policy,
            state: SessionState::default(),
            frozen: false,
        }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn policy(&self) -> &ExplorationPolicy {
        &self.policy
    }

    pub fn episodes(&self) -> usize {
        self.state.episodes
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn restore(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze disables learning and exploration (evaluation).
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Whether the training-episode budget is exhausted.
    pub fn budget_exhausted(&self) -> bool {
        self.config
            .num_train_episodes
            .is_some_and(|budget| self.state.episodes >= budget)
    }

    /// Whether updates should be applied at all.
    pub fn is_learning(&self) -> bool {
        !self.frozen && !self.budget_exhausted()
    }

    /// Decayed learning rate for the current episode.
    pub fn learning_rate(&self) -> f64 {
        decay(self.config.learning_rate, self.state.episodes, DECAY_RATE)
    }

    /// Explore probability for the current episode.
    pub fn explore_rate(&self) -> f64 {
        if self.is_learning() {
            self.policy.rate(self.state.episodes)
        } else {
            0.0
        }
    }

    /// Explore probability for a state seen `visits` times.
    pub fn explore_rate_for_visits(&self, visits: u32) -> f64 {
        if self.is_learning() {
            self.policy.rate_for_visits(self.state.episodes, visits)
        } else {
            0.0
        }
    }

    /// Close an episode with its final score. Returns the batch statistics
    /// when this episode completes a batch. Frozen sessions keep no record.
    pub fn finish_episode(&mut self, agent: &str, score: u32) -> Option<BatchSummary> {
        if self.frozen {
            return None;
        }
        let mut summary = None;
        if let Some(batch) = self.config.batch_size.filter(|&b| b > 0) {
            self.state.batch_scores.push(score);
            if self.state.episodes % batch == batch - 1 {
                let scores = std::mem::take(&mut self.state.batch_scores);
                let mean_score = if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64
                };
                let batch_summary = BatchSummary {
                    first_episode: self.state.episodes + 2 - batch,
                    last_episode: self.state.episodes + 1,
                    mean_score,
                    learning_rate: self.learning_rate(),
                    explore_rate: self.explore_rate(),
                };
                tracing::info!(
                    agent,
                    first = batch_summary.first_episode,
                    last = batch_summary.last_episode,
                    mean_score = batch_summary.mean_score,
                    learning_rate = batch_summary.learning_rate,
                    explore_rate = batch_summary.explore_rate,
                    "batch complete"
                );
                summary = Some(batch_summary);
            }
        }
        self.state.episodes += 1;
        summary
    }
}
