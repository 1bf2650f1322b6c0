use super::agent::{Agent, Observation};
use crate::game::Action;

/// Adapter for keyboard play: the input layer calls [`HumanAgent::press`],
/// and the next decision consumes the stored action.
#[derive(Debug, Default)]
pub struct HumanAgent {
    pending: Action,
}

impl HumanAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a one-shot action, replacing any unconsumed one.
    pub fn press(&mut self, action: Action) {
        self.pending = action;
    }

    pub fn pending(&self) -> Action {
        self.pending
    }
}

impl Agent for HumanAgent {
    fn decide(&mut self, _observation: &Observation<'_>) -> Action {
        std::mem::take(&mut self.pending)
    }

    fn name(&self) -> &str {
        "Human"
    }
}
