use std::fmt;

/// Contents of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Obstacle,
    Agent,
    Collided,
}

impl Cell {
    /// Numeric code fed to the value networks.
    pub fn code(self) -> f32 {
        match self {
            Cell::Empty => 0.0,
            Cell::Obstacle => 1.0,
            Cell::Agent => 2.0,
            Cell::Collided => 3.0,
        }
    }

    /// True for the two cells that mark the controlled entity.
    pub fn is_entity(self) -> bool {
        matches!(self, Cell::Agent | Cell::Collided)
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Obstacle => '#',
            Cell::Agent => 'A',
            Cell::Collided => 'X',
        }
    }
}

/// A cell coordinate. Row 0 is the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

/// Rectangular grid of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an all-empty board.
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "board dimensions must be non-zero");
        Board {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Spawn cell: bottom row, horizontally centered, rounding down on ties.
    pub fn spawn_position(rows: usize, cols: usize) -> Position {
        Position::new(rows - 1, (cols - 1) / 2)
    }

    /// Create an empty board with the entity placed at the spawn cell.
    pub fn with_spawn(rows: usize, cols: usize) -> (Self, Position) {
        let mut board = Board::new(rows, cols);
        let spawn = Board::spawn_position(rows, cols);
        board.set(spawn, Cell::Agent);
        (board, spawn)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the cell at a position.
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row * self.cols + pos.col]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row * self.cols + pos.col] = cell;
    }

    /// Cell at signed coordinates, `None` outside the board.
    pub fn get_signed(&self, row: i64, col: i64) -> Option<Cell> {
        if row < 0 || col < 0 || row >= self.rows as i64 || col >= self.cols as i64 {
            return None;
        }
        Some(self.get(Position::new(row as usize, col as usize)))
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Number of cells holding the controlled entity (alive or crashed).
    pub fn entity_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_entity()).count()
    }

    /// Shift every row down by one, feeding `top` into row 0.
    ///
    /// The entity keeps its cell when an empty cell falls onto it; an
    /// incoming obstacle overwrites it. The entity itself never falls into
    /// the row below.
    pub fn shift_down(&mut self, top: &[Cell]) {
        assert_eq!(top.len(), self.cols, "generated row has the wrong width");
        for row in (0..self.rows).rev() {
            for col in 0..self.cols {
                let incoming = if row == 0 {
                    top[col]
                } else {
                    self.get(Position::new(row - 1, col))
                };
                let here = Position::new(row, col);
                let current = self.get(here);
                let entity_shelters = current == Cell::Agent && incoming == Cell::Empty;
                if !entity_shelters && incoming != Cell::Agent {
                    self.set(here, incoming);
                }
            }
        }
    }

    /// Rows between `from` and the nearest obstacle above it in `col`,
    /// counting `from` itself as distance 0. `None` when the column is clear.
    pub fn obstacle_distance_above(&self, from: Position) -> Option<usize> {
        (0..=from.row)
            .rev()
            .find(|&row| self.get(Position::new(row, from.col)) == Cell::Obstacle)
            .map(|row| from.row - row)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let line: String = self.row(row).iter().map(|c| c.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
