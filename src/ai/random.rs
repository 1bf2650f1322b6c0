use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::agent::{Agent, Observation};
use crate::game::{Action, ACTIONS, NUM_ACTIONS};

/// An agent that moves uniformly at random.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        RandomAgent {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn decide(&mut self, _observation: &Observation<'_>) -> Action {
        ACTIONS[self.rng.random_range(0..NUM_ACTIONS)]
    }

    fn name(&self) -> &str {
        "Random"
    }
}
