//! Checkpoint persistence: agent weights, session counters and metadata in
//! one directory per save, with a `latest` symlink for resuming.

mod manager;
mod metadata;

pub use manager::{AgentCheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics};
