use serde::{Deserialize, Serialize};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub average_score: f32,
    pub best_score: u32,
    pub average_episode_ticks: f32,
    pub truncated_episodes: usize,
}

/// Learner options recorded in checkpoint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub explore_rate: f64,
    pub glie: bool,
    pub batch_size: Option<usize>,
    pub num_train_episodes: Option<usize>,
    pub n_eps: u32,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub algorithm: String,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}
