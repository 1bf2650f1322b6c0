use serde::{Deserialize, Serialize};

/// A move request issued by an agent.
///
/// Only `col_delta` in `{-1, 0, 1}` is honored by the engine; rows are
/// advanced by the engine itself when obstacles fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Action {
    pub row_delta: i32,
    pub col_delta: i32,
}

impl Action {
    pub const LEFT: Action = Action::new(0, -1);
    pub const RIGHT: Action = Action::new(0, 1);
    pub const STAY: Action = Action::new(0, 0);

    pub const fn new(row_delta: i32, col_delta: i32) -> Self {
        Action {
            row_delta,
            col_delta,
        }
    }

    /// Index of this action in [`ACTIONS`], if it is one of them.
    pub fn index(self) -> Option<usize> {
        ACTIONS.iter().position(|&a| a == self)
    }

    pub fn is_neutral(self) -> bool {
        self.row_delta == 0 && self.col_delta == 0
    }
}

/// Number of actions in the fixed action set.
pub const NUM_ACTIONS: usize = 3;

/// The fixed action set, in tie-breaking order.
pub const ACTIONS: [Action; NUM_ACTIONS] = [Action::LEFT, Action::RIGHT, Action::STAY];
