use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ai::LearningAgent;
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics};
use crate::error::CheckpointError;

const METADATA_FILE: &str = "metadata.json";
const TRAINING_STATE_FILE: &str = "training_state.json";
const LATEST_LINK: &str = "latest";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    /// Number of most recent checkpoints kept on disk.
    pub keep_last_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig { keep_last_n: 5 }
    }
}

/// Algorithm-agnostic checkpoint data. The agent deserializes its own training state.
#[derive(Debug)]
pub struct AgentCheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state_json: String,
}

impl AgentCheckpointData {
    /// Load weights and session counters into `agent`.
    pub fn restore(&self, agent: &mut dyn LearningAgent) -> Result<(), CheckpointError> {
        if self.metadata.algorithm != agent.algorithm_name() {
            return Err(CheckpointError::AlgorithmMismatch {
                expected: agent.algorithm_name().to_string(),
                found: self.metadata.algorithm.clone(),
            });
        }
        agent.load_weights_from_dir(&self.path)?;
        agent.restore_training_state_json(&self.training_state_json)?;
        tracing::info!(
            path = %self.path.display(),
            episode = self.metadata.episode,
            "restored checkpoint"
        );
        Ok(())
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(
        dir: impl Into<PathBuf>,
        config: CheckpointManagerConfig,
    ) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(CheckpointManager { dir, config })
    }

    /// Save a checkpoint through the [`LearningAgent`] interface.
    pub fn save_agent_checkpoint(
        &self,
        agent: &dyn LearningAgent,
        metrics: &CheckpointMetrics,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", episode);
        let tmp_dir = self.dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        agent.save_weights_to_dir(&tmp_dir)?;
        fs::write(tmp_dir.join(TRAINING_STATE_FILE), agent.training_state_json()?)?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let metadata = CheckpointMetadata {
            episode,
            timestamp,
            algorithm: agent.algorithm_name().to_string(),
            metrics: metrics.clone(),
            hyperparameters: agent.hyperparameters(),
        };
        fs::write(tmp_dir.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        tracing::info!(path = %final_dir.display(), episode, "saved checkpoint");
        Ok(final_dir)
    }

    /// Load checkpoint data in an algorithm-agnostic way.
    pub fn load_agent_checkpoint(
        &self,
        dir: &Path,
    ) -> Result<AgentCheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        let metadata = read_metadata(&dir.join(METADATA_FILE))?;

        let ts_path = dir.join(TRAINING_STATE_FILE);
        let training_state_json =
            fs::read_to_string(&ts_path).map_err(|e| CheckpointError::MetadataRead {
                path: ts_path,
                source: e,
            })?;

        Ok(AgentCheckpointData {
            path: dir.to_path_buf(),
            metadata,
            training_state_json,
        })
    }

    /// Load the checkpoint the `latest` symlink points at.
    pub fn load_agent_latest(&self) -> Result<AgentCheckpointData, CheckpointError> {
        let latest_link = self.dir.join(LATEST_LINK);
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(self.dir.clone()));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.dir.join(resolved)
        } else {
            resolved
        };
        self.load_agent_checkpoint(&target)
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Delete all but the newest `keep_last_n` checkpoints.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        let excess = checkpoints.len().saturating_sub(self.config.keep_last_n.max(1));
        for (path, metadata) in checkpoints.into_iter().take(excess) {
            tracing::debug!(episode = metadata.episode, "pruning checkpoint");
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    /// Point the `latest` symlink at the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.dir.join(LATEST_LINK);
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}
