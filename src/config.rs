use std::path::Path;

use crate::ai::{LearnerConfig, MonteCarloConfig, QLearningConfig, TemporalDifferenceConfig};
use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::game::EngineConfig;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub learner: LearnerConfig,
    pub q_learning: QLearningConfig,
    pub temporal_difference: TemporalDifferenceConfig,
    pub monte_carlo: MonteCarloConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.rows == 0 || self.engine.cols == 0 {
            return Err(ConfigError::Validation(
                "engine.rows and engine.cols must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.engine.density) {
            return Err(ConfigError::Validation(
                "engine.density must be in [0, 1]".into(),
            ));
        }

        if self.learner.learning_rate < 0.0 {
            return Err(ConfigError::Validation(
                "learner.learning_rate must be >= 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.learner.discount_factor) {
            return Err(ConfigError::Validation(
                "learner.discount_factor must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.learner.explore_rate) {
            return Err(ConfigError::Validation(
                "learner.explore_rate must be in [0, 1]".into(),
            ));
        }
        if self.learner.batch_size == Some(0) {
            return Err(ConfigError::Validation(
                "learner.batch_size must be > 0".into(),
            ));
        }
        if self.learner.num_train_episodes == Some(0) {
            return Err(ConfigError::Validation(
                "learner.num_train_episodes must be > 0".into(),
            ));
        }

        if self.q_learning.horizon == 0 {
            return Err(ConfigError::Validation(
                "q_learning.horizon must be > 0".into(),
            ));
        }
        if self.q_learning.step_penalty < 0.0 {
            return Err(ConfigError::Validation(
                "q_learning.step_penalty must be >= 0".into(),
            ));
        }

        if self.temporal_difference.hidden_size == 0 {
            return Err(ConfigError::Validation(
                "temporal_difference.hidden_size must be > 0".into(),
            ));
        }

        if self.monte_carlo.hidden_size == 0 {
            return Err(ConfigError::Validation(
                "monte_carlo.hidden_size must be > 0".into(),
            ));
        }
        if self.monte_carlo.replay_capacity == 0 {
            return Err(ConfigError::Validation(
                "monte_carlo.replay_capacity must be > 0".into(),
            ));
        }
        if self.monte_carlo.offspring == 0 {
            return Err(ConfigError::Validation(
                "monte_carlo.offspring must be >= 1".into(),
            ));
        }

        if self.training.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "training.num_episodes must be > 0".into(),
            ));
        }
        if self.training.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }
        if self.training.max_ticks_per_episode == Some(0) {
            return Err(ConfigError::Validation(
                "training.max_ticks_per_episode must be > 0".into(),
            ));
        }
        if self.checkpoint.keep_last_n == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.keep_last_n must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
