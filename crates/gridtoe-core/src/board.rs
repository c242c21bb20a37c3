use serde::{Deserialize, Serialize};

/// A player's mark. Also used to name the two seats in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The mark that moves after this one.
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Occupancy of a single board cell. Empty cells go over the wire as `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

/// Square grid of cells stored row-major: `(row, col)` lives at
/// `row * grid_size + col`. Always holds exactly `grid_size²` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    grid_size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an empty `grid_size` × `grid_size` board.
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            cells: vec![Cell::Empty; grid_size * grid_size],
        }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// True when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Write `mark` into `index`.
    ///
    /// Performs no occupancy check; callers validate the index and that the
    /// cell is empty before placing. Panics if `index` is out of range.
    pub fn place(&mut self, index: usize, mark: Mark) {
        self.cells[index] = mark.into();
    }

    /// Empty every cell, keeping the grid size.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }
}
