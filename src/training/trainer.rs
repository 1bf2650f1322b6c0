use std::path::PathBuf;

use crate::ai::LearningAgent;
use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig};
use crate::error::TrainingError;
use crate::game::EngineConfig;
use crate::training::episode::{episode_seed, play_episode};
use crate::training::metrics::TrainingMetrics;

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    /// Episodes longer than this are cut off and abandoned.
    pub max_ticks_per_episode: Option<u64>,
    pub log_interval: usize,
    /// Episodes between checkpoints; 0 disables checkpointing.
    pub checkpoint_interval: usize,
    pub checkpoint_dir: PathBuf,
    /// Block on background training after every episode.
    pub await_training: bool,
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 1_000,
            max_ticks_per_episode: Some(100_000),
            log_interval: 100,
            checkpoint_interval: 500,
            checkpoint_dir: PathBuf::from("checkpoints"),
            await_training: true,
            seed: None,
        }
    }
}

/// Summary returned by [`Trainer::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub episodes: usize,
    pub average_score: f32,
    pub best_score: u32,
    pub truncated: usize,
    pub last_checkpoint: Option<PathBuf>,
}

/// Episode loop driving a [`LearningAgent`] on freshly seeded engines.
pub struct Trainer {
    config: TrainerConfig,
    engine: EngineConfig,
    checkpoint_manager: Option<CheckpointManager>,
}

impl Trainer {
    pub fn new(
        config: TrainerConfig,
        engine: EngineConfig,
        checkpoint: CheckpointManagerConfig,
    ) -> Result<Self, TrainingError> {
        if config.num_episodes == 0 {
            return Err(TrainingError::NoEpisodes);
        }
        let checkpoint_manager = if config.checkpoint_interval > 0 {
            Some(CheckpointManager::new(config.checkpoint_dir.clone(), checkpoint)?)
        } else {
            None
        };
        Ok(Trainer {
            config,
            engine,
            checkpoint_manager,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full training loop, continuing from the agent's episode count.
    pub fn train(&self, agent: &mut dyn LearningAgent) -> Result<TrainingReport, TrainingError> {
        let mut metrics = TrainingMetrics::new();
        let base_seed = self.config.seed.or(self.engine.seed).unwrap_or_else(rand::random);
        let start = agent.episode_count();
        let window = self.config.log_interval.max(1);
        let mut last_checkpoint = None;

        tracing::info!(
            algorithm = agent.algorithm_name(),
            episodes = self.config.num_episodes,
            start,
            rows = self.engine.rows,
            cols = self.engine.cols,
            "starting training"
        );

        for offset in 1..=self.config.num_episodes {
            let index = start + offset;
            let seed = episode_seed(base_seed, index);
            let result = play_episode(agent, &self.engine, seed, self.config.max_ticks_per_episode);
            if self.config.await_training {
                agent.finish_pending();
            }
            if result.truncated {
                tracing::debug!(episode = index, ticks = result.ticks, "episode truncated");
            }
            metrics.record_episode(result);

            if offset % window == 0 {
                tracing::info!(
                    episode = index,
                    avg_score = metrics.average_score(window),
                    best = metrics.best_score(),
                    avg_ticks = metrics.average_episode_ticks(window),
                    lr = agent.learning_rate(),
                    explore = agent.explore_rate(),
                    "training progress"
                );
            }

            if let Some(manager) = &self.checkpoint_manager {
                if offset % self.config.checkpoint_interval == 0 {
                    agent.finish_pending();
                    let path = manager.save_agent_checkpoint(
                        agent,
                        &metrics.to_checkpoint_metrics(window),
                        index,
                    )?;
                    last_checkpoint = Some(path);
                }
            }
        }

        agent.finish_pending();
        let report = TrainingReport {
            episodes: metrics.total_episodes(),
            average_score: metrics.average_score(window),
            best_score: metrics.best_score(),
            truncated: metrics.truncated(),
            last_checkpoint,
        };
        tracing::info!(
            episodes = report.episodes,
            avg_score = report.average_score,
            best = report.best_score,
            truncated = report.truncated,
            "training complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{
        LearnerConfig, MonteCarloAgent, MonteCarloConfig, QLearningAgent, QLearningConfig,
    };

    fn engine() -> EngineConfig {
        EngineConfig {
            rows: 5,
            cols: 5,
            density: 0.4,
            ..Default::default()
        }
    }

    fn trainer_config(dir: &std::path::Path, episodes: usize, interval: usize) -> TrainerConfig {
        TrainerConfig {
            num_episodes: episodes,
            max_ticks_per_episode: Some(3_000),
            log_interval: 2,
            checkpoint_interval: interval,
            checkpoint_dir: dir.to_path_buf(),
            await_training: true,
            seed: Some(17),
        }
    }

    fn q_agent() -> QLearningAgent {
        QLearningAgent::new(
            LearnerConfig {
                explore_rate: 0.2,
                seed: Some(4),
                ..Default::default()
            },
            QLearningConfig::default(),
        )
    }

    #[test]
    fn test_zero_episodes_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Trainer::new(
            trainer_config(dir.path(), 0, 0),
            engine(),
            CheckpointManagerConfig::default(),
        );
        assert!(matches!(result, Err(TrainingError::NoEpisodes)));
    }

    #[test]
    fn test_train_runs_all_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(
            trainer_config(dir.path(), 6, 0),
            engine(),
            CheckpointManagerConfig::default(),
        )
        .unwrap();
        let mut agent = q_agent();
        let report = trainer.train(&mut agent).unwrap();

        assert_eq!(report.episodes, 6);
        assert_eq!(agent.episode_count(), 6 - report.truncated);
        assert!(report.last_checkpoint.is_none());
        assert!(!agent.table().is_empty());
    }

    #[test]
    fn test_train_writes_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(
            trainer_config(dir.path(), 4, 2),
            engine(),
            CheckpointManagerConfig { keep_last_n: 5 },
        )
        .unwrap();
        let mut agent = q_agent();
        let report = trainer.train(&mut agent).unwrap();

        let manager =
            CheckpointManager::new(dir.path(), CheckpointManagerConfig::default()).unwrap();
        let checkpoints = manager.list_checkpoints().unwrap();
        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[0].1.episode, 2);
        assert_eq!(checkpoints[1].1.episode, 4);
        assert_eq!(report.last_checkpoint, Some(checkpoints[1].0.clone()));
        assert_eq!(manager.load_agent_latest().unwrap().metadata.algorithm, "Q");
    }

    #[test]
    fn test_monte_carlo_training_settles_pending_work() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(
            trainer_config(dir.path(), 3, 0),
            engine(),
            CheckpointManagerConfig::default(),
        )
        .unwrap();
        let mut agent = MonteCarloAgent::new(
            LearnerConfig {
                learning_rate: 0.05,
                explore_rate: 0.1,
                seed: Some(2),
                ..Default::default()
            },
            MonteCarloConfig {
                generations: 3,
                offspring: 2,
                ..Default::default()
            },
            5,
            5,
        );
        let report = trainer.train(&mut agent).unwrap();
        assert_eq!(report.episodes, 3);
        assert!(!agent.is_training());
    }
}
