//! Obstacle row generation with a solvability guarantee.
//!
//! Every fall tick a fresh top row is drawn at random. A breadth-first search
//! then walks from the previously open columns (now one row lower) sideways
//! and upwards to find which top-row columns are still reachable. If the new
//! row sealed every path, one of the blocking obstacles is removed.

use std::collections::{BTreeSet, HashSet, VecDeque};

use rand::Rng;

use super::board::{Board, Cell, Position};

/// Result of securing a freshly generated top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Top-row columns reachable from the entity's row.
    pub open: BTreeSet<usize>,
    /// Top-row columns whose obstacle stopped the search.
    pub blocking: BTreeSet<usize>,
    /// Column cleared to keep the board solvable, if any.
    pub repaired: Option<usize>,
}

/// Produces obstacle rows and tracks which top-row columns stay reachable.
#[derive(Debug, Clone)]
pub struct EscapeGenerator {
    density: f64,
    open_columns: BTreeSet<usize>,
    generations: u64,
}

impl EscapeGenerator {
    /// Start with every column open, as on an empty board.
    pub fn new(cols: usize, density: f64) -> Self {
        EscapeGenerator {
            density: density.clamp(0.0, 1.0),
            open_columns: (0..cols).collect(),
            generations: 0,
        }
    }

    /// Replace the tracked open columns.
    pub fn with_open_columns(mut self, open: impl IntoIterator<Item = usize>) -> Self {
        self.open_columns = open.into_iter().collect();
        self
    }

    pub fn open_columns(&self) -> &BTreeSet<usize> {
        &self.open_columns
    }

    /// Draw a new top row: each cell is an obstacle with probability `density`.
    pub fn draw_row<R: Rng>(&self, cols: usize, rng: &mut R) -> Vec<Cell> {
        (0..cols)
            .map(|_| {
                if rng.random_bool(self.density) {
                    Cell::Obstacle
                } else {
                    Cell::Empty
                }
            })
            .collect()
    }

    /// Search the board from the open columns and repair row 0 if it seals
    /// every path. Must be called after the new row has been shifted in.
    pub fn secure_top_row<R: Rng>(&mut self, board: &mut Board, rng: &mut R) -> Generation {
        let (mut open, blocking) = self.search(board);

        let mut repaired = None;
        if open.is_empty() && !blocking.is_empty() {
            let pick = rng.random_range(0..blocking.len());
            if let Some(&col) = blocking.iter().nth(pick) {
                board.set(Position::new(0, col), Cell::Empty);
                open.insert(col);
                repaired = Some(col);
            }
        }

        assert!(
            !open.is_empty() || self.generations == 0,
            "escape generator found neither open nor blocking columns"
        );

        self.generations += 1;
        self.open_columns = open.clone();

        Generation {
            open,
            blocking,
            repaired,
        }
    }

    /// Breadth-first search over non-obstacle cells, moving left, right and up.
    fn search(&self, board: &Board) -> (BTreeSet<usize>, BTreeSet<usize>) {
        let cols = board.cols();
        // On a single-row board the new row is the entity's row.
        let seed_row = board.rows().min(2) - 1;

        let mut open = BTreeSet::new();
        let mut blocking = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<(usize, usize)> = self
            .open_columns
            .iter()
            .filter(|&&col| col < cols)
            .map(|&col| (seed_row, col))
            .collect();

        while let Some((row, col)) = queue.pop_front() {
            if !visited.insert((row, col)) {
                continue;
            }
            if board.get(Position::new(row, col)) == Cell::Obstacle {
                if row == 0 {
                    blocking.insert(col);
                }
                continue;
            }
            if row == 0 {
                open.insert(col);
            }
            if col > 0 {
                queue.push_back((row, col - 1));
            }
            if col + 1 < cols {
                queue.push_back((row, col + 1));
            }
            if row > 0 {
                queue.push_back((row - 1, col));
            }
        }

        (open, blocking)
    }
}
