use std::collections::VecDeque;

use crate::checkpoint::CheckpointMetrics;

/// Result of a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeResult {
    pub score: u32,
    pub ticks: u64,
    /// The episode hit the tick cap before a collision.
    pub truncated: bool,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    best_score: u32,
    truncated: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            best_score: 0,
            truncated: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.best_score = self.best_score.max(result.score);
        if result.truncated {
            self.truncated += 1;
        }
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    /// Mean score over the last N episodes.
    pub fn average_score(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: u64 = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.score as u64)
            .sum();
        total as f32 / n as f32
    }

    /// Mean episode length in ticks over the last N episodes.
    pub fn average_episode_ticks(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: u64 = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.ticks)
            .sum();
        total as f32 / n as f32
    }

    /// Highest score seen over the whole run.
    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Lifetime count of episodes cut off by the tick cap.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Snapshot for checkpoint metadata, averaged over the last `window` episodes.
    pub fn to_checkpoint_metrics(&self, window: usize) -> CheckpointMetrics {
        CheckpointMetrics {
            average_score: self.average_score(window),
            best_score: self.best_score,
            average_episode_ticks: self.average_episode_ticks(window),
            truncated_episodes: self.truncated,
        }
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
