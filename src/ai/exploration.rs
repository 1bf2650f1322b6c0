use rand::Rng;

/// Rate used by every exponential schedule in the learners.
pub const DECAY_RATE: f64 = 0.01;

/// `initial · e^(-rate · t)`.
pub fn decay(initial: f64, t: usize, rate: f64) -> f64 {
    initial * (-rate * t as f64).exp()
}

/// Chooses how often a learner picks a random action instead of the greedy one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationPolicy {
    pub explore_rate: f64,
    /// Decay the rate with the episode count (greedy in the limit).
    pub glie: bool,
    /// States visited fewer times than this are always explored.
    pub n_eps: u32,
}

impl ExplorationPolicy {
    pub fn new(explore_rate: f64, glie: bool, n_eps: u32) -> Self {
        ExplorationPolicy {
            explore_rate: explore_rate.clamp(0.0, 1.0),
            glie,
            n_eps,
        }
    }

    /// Explore probability for episode `t`.
    pub fn rate(&self, t: usize) -> f64 {
        if self.glie {
            decay(self.explore_rate, t, DECAY_RATE)
        } else {
            self.explore_rate
        }
    }

    /// Explore probability for a state seen `visits` times.
    pub fn rate_for_visits(&self, t: usize, visits: u32) -> f64 {
        if visits < self.n_eps {
            1.0
        } else {
            self.rate(t)
        }
    }

    /// Bernoulli draw with probability `p`.
    pub fn roll<R: Rng>(p: f64, rng: &mut R) -> bool {
        p > 0.0 && rng.random::<f64>() < p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_decay() {
        assert_eq!(decay(0.5, 0, DECAY_RATE), 0.5);
        let expected = 0.5 * (-1.0f64).exp();
        assert!((decay(0.5, 100, DECAY_RATE) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_rate_without_glie() {
        let policy = ExplorationPolicy::new(0.3, false, 0);
        assert_eq!(policy.rate(0), 0.3);
        assert_eq!(policy.rate(10_000), 0.3);
    }

    #[test]
    fn test_glie_decreases() {
        let policy = ExplorationPolicy::new(0.8, true, 0);
        assert_eq!(policy.rate(0), 0.8);
        assert!(policy.rate(50) < policy.rate(10));
        assert!(policy.rate(5000) < 1e-10);
    }

    #[test]
    fn test_unvisited_states_always_explored() {
        let policy = ExplorationPolicy::new(0.1, false, 3);
        assert_eq!(policy.rate_for_visits(0, 0), 1.0);
        assert_eq!(policy.rate_for_visits(0, 2), 1.0);
        assert_eq!(policy.rate_for_visits(0, 3), 0.1);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(ExplorationPolicy::new(1.5, false, 0).rate(0), 1.0);
        assert_eq!(ExplorationPolicy::new(-0.5, false, 0).rate(0), 0.0);
    }

    #[test]
    fn test_roll_extremes() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            assert!(!ExplorationPolicy::roll(0.0, &mut rng));
            assert!(ExplorationPolicy::roll(1.0, &mut rng));
        }
    }
}
