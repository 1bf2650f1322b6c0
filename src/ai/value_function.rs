use crate::game::{Action, ACTIONS, NUM_ACTIONS};

/// A regression target for one state-action pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTarget<S> {
    pub state: S,
    pub action: Action,
    pub target: f32,
}

/// Action-value estimator behind every learning agent.
pub trait ValueFunction {
    type State;

    /// Estimated value of taking `action` in `state`.
    fn predict(&self, state: &Self::State, action: Action) -> f32;

    /// Move the estimates toward `batch` at the given rate. Returns the
    /// mean squared error seen by the update.
    fn train(&mut self, batch: &[ValueTarget<Self::State>], rate: f64) -> f32;

    /// Values of every action in [`ACTIONS`] order.
    fn action_values(&self, state: &Self::State) -> [f32; NUM_ACTIONS] {
        ACTIONS.map(|action| self.predict(state, action))
    }

    /// Highest-valued action; ties go to the earliest in [`ACTIONS`].
    fn greedy_action(&self, state: &Self::State) -> Action {
        let values = self.action_values(state);
        let mut best = 0;
        for (idx, &value) in values.iter().enumerate().skip(1) {
            if value > values[best] {
                best = idx;
            }
        }
        ACTIONS[best]
    }

    fn max_value(&self, state: &Self::State) -> f32 {
        self.action_values(state)
            .into_iter()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed([f32; NUM_ACTIONS]);

    impl ValueFunction for Fixed {
        type State = ();

        fn predict(&self, _state: &(), action: Action) -> f32 {
            action.index().map_or(0.0, |idx| self.0[idx])
        }

        fn train(&mut self, _batch: &[ValueTarget<()>], _rate: f64) -> f32 {
            0.0
        }
    }

    #[test]
    fn test_ties_prefer_left() {
        assert_eq!(Fixed([0.0; 3]).greedy_action(&()), Action::LEFT);
        assert_eq!(Fixed([1.0, 2.0, 2.0]).greedy_action(&()), Action::RIGHT);
    }

    #[test]
    fn test_greedy_picks_maximum() {
        let values = Fixed([-1.0, -3.0, 0.5]);
        assert_eq!(values.greedy_action(&()), Action::STAY);
        assert_eq!(values.max_value(&()), 0.5);
    }
}
