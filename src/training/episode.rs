use crate::ai::LearningAgent;
use crate::game::{EngineConfig, GameEngine};
use crate::training::metrics::EpisodeResult;

/// Play one episode on a fresh engine seeded with `seed`.
///
/// An episode cut off at `max_ticks` is abandoned so the agent does not learn
/// from a trajectory that never reached a terminal state.
pub fn play_episode(
    agent: &mut dyn LearningAgent,
    engine_config: &EngineConfig,
    seed: u64,
    max_ticks: Option<u64>,
) -> EpisodeResult {
    let mut engine = GameEngine::new(EngineConfig {
        seed: Some(seed),
        ..engine_config.clone()
    });
    let mut driver = agent;
    let outcome = engine.run_episode(Some(&mut driver), max_ticks);
    let truncated = !outcome.collided;
    if truncated {
        driver.abandon_episode();
    }
    EpisodeResult {
        score: outcome.score,
        ticks: outcome.ticks,
        truncated,
    }
}

/// Mean score over `episodes` greedy episodes with learning and exploration off.
pub fn evaluate(
    agent: &mut dyn LearningAgent,
    engine_config: &EngineConfig,
    episodes: usize,
    max_ticks: Option<u64>,
) -> f64 {
    if episodes == 0 {
        return 0.0;
    }
    let eval_state = agent.enter_eval_mode();
    let base = engine_config.seed.unwrap_or(0);

    let mut total = 0u64;
    for index in 0..episodes {
        let result = play_episode(agent, engine_config, episode_seed(base, index), max_ticks);
        total += result.score as u64;
    }

    agent.exit_eval_mode(eval_state);
    total as f64 / episodes as f64
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
