mod monte_carlo;
mod q_learning;
mod temporal_difference;

pub use monte_carlo::{
    discounted_returns, replay_sample_size, Experience, MonteCarloAgent, MonteCarloConfig,
};
pub use q_learning::{QLearningAgent, QLearningConfig, Q_TABLE_FILE};
pub use temporal_difference::{TemporalDifferenceAgent, TemporalDifferenceConfig};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::exploration::ExplorationPolicy;
use crate::ai::value_function::ValueFunction;
use crate::game::{Action, ACTIONS, NUM_ACTIONS};

/// The previous decision, kept until the next observation reveals its reward.
#[derive(Debug, Clone)]
pub(crate) struct LastStep<S> {
    pub state: S,
    pub action: Action,
    pub score: u32,
}

/// Uniform random action with probability `explore`, greedy otherwise.
pub(crate) fn choose_action<V, R>(values: &V, state: &V::State, explore: f64, rng: &mut R) -> Action
where
    V: ValueFunction,
    R: Rng,
{
    if ExplorationPolicy::roll(explore, rng) {
        ACTIONS[rng.random_range(0..NUM_ACTIONS)]
    } else {
        values.greedy_action(state)
    }
}

pub(crate) fn agent_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
