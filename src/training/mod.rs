//! Training infrastructure: episode runner, evaluation, replay buffer and
//! metrics collection.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use episode::{episode_seed, evaluate, play_episode};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{Trainer, TrainerConfig, TrainingReport};
