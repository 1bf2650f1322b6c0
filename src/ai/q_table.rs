use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::state_encoding::StateKey;
use super::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::{Action, NUM_ACTIONS};

/// Tabular action values with per-state visit counts. Unseen entries are 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<StateKey, [f32; NUM_ACTIONS]>,
    visits: HashMap<StateKey, u32>,
}

/// On-disk form; JSON objects cannot use tuple keys.
#[derive(Serialize, Deserialize)]
struct QTableRecord {
    entries: Vec<QTableEntry>,
}

#[derive(Serialize, Deserialize)]
struct QTableEntry {
    state: StateKey,
    values: [f32; NUM_ACTIONS],
    visits: u32,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of states with stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn visits(&self, state: &StateKey) -> u32 {
        self.visits.get(state).copied().unwrap_or(0)
    }

    pub fn record_visit(&mut self, state: StateKey) {
        *self.visits.entry(state).or_insert(0) += 1;
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut states: Vec<&StateKey> = self.values.keys().chain(self.visits.keys()).collect();
        states.sort();
        states.dedup();
        let record = QTableRecord {
            entries: states
                .into_iter()
                .map(|state| QTableEntry {
                    state: *state,
                    values: self.values.get(state).copied().unwrap_or_default(),
                    visits: self.visits(state),
                })
                .collect(),
        };
        std::fs::write(path, serde_json::to_string(&record)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let content = std::fs::read_to_string(path)?;
        let record: QTableRecord = serde_json::from_str(&content)?;
        let mut table = QTable::new();
        for entry in record.entries {
            table.values.insert(entry.state, entry.values);
            if entry.visits > 0 {
                table.visits.insert(entry.state, entry.visits);
            }
        }
        Ok(table)
    }
}

impl ValueFunction for QTable {
    type State = StateKey;

    fn predict(&self, state: &StateKey, action: Action) -> f32 {
        match (self.values.get(state), action.index()) {
            (Some(values), Some(idx)) => values[idx],
            _ => 0.0,
        }
    }

    fn action_values(&self, state: &StateKey) -> [f32; NUM_ACTIONS] {
        self.values.get(state).copied().unwrap_or_default()
    }

    /// `Q[s][a] += rate · (target − Q[s][a])` for each entry.
    fn train(&mut self, batch: &[ValueTarget<StateKey>], rate: f64) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let mut squared_error = 0.0;
        for item in batch {
            let Some(idx) = item.action.index() else {
                continue;
            };
            let values = self.values.entry(item.state).or_insert([0.0; NUM_ACTIONS]);
            let error = item.target - values[idx];
            values[idx] += rate as f32 * error;
            squared_error += error * error;
        }
        squared_error / batch.len() as f32
    }
}
