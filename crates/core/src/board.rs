//! Cell classification for the two battle grids shown in the game view.
//!
//! Both grids are pure functions of the server's ship and move lists plus the
//! viewer's id. Ship occupancy covers the anchor cell only; placements are not
//! expanded along their size and direction.

use crate::models::{Move, ShipCoord};

/// Row letters, top to bottom.
pub const ROWS: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
/// Column numbers, left to right.
pub const COLUMNS: [u32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
/// Width and height of a grid.
pub const GRID_SIZE: usize = 10;

/// Visual state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    /// Nothing known about the cell.
    #[default]
    Empty,
    /// One of the viewer's ships sits here.
    Ship,
    /// A strike landed on a ship.
    Hit,
    /// A strike landed in open water.
    Miss,
}

/// Which of the two grids is being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSide {
    /// The viewer's fleet, showing incoming strikes.
    Own,
    /// The opponent's waters, showing the viewer's strikes only.
    Opponent,
}

/// A 10x10 grid of classified cells, indexed `[row][column]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[CellState; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    fn empty() -> Self {
        Self {
            cells: [[CellState::Empty; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// State at zero-based `row` and `col`, `None` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<CellState> {
        self.cells.get(row).and_then(|cells| cells.get(col)).copied()
    }

    /// Rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[CellState; GRID_SIZE]> {
        self.cells.iter()
    }

    /// Number of cells in the given state.
    pub fn count(&self, state: CellState) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell == state)
            .count()
    }
}

/// Classified grids for both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boards {
    /// The viewer's grid.
    pub own: Grid,
    /// The opponent's grid.
    pub opponent: Grid,
}

impl Boards {
    /// Classify both grids for `viewer_id`.
    pub fn classify(ships: &[ShipCoord], moves: &[Move], viewer_id: &str) -> Self {
        Self {
            own: classify(ships, moves, viewer_id, BoardSide::Own),
            opponent: classify(ships, moves, viewer_id, BoardSide::Opponent),
        }
    }
}

/// Classify every cell of one grid.
///
/// When a cell holds both a ship and a strike record, the strike wins.
/// The first matching move decides hit or miss.
pub fn classify(ships: &[ShipCoord], moves: &[Move], viewer_id: &str, side: BoardSide) -> Grid {
    let mut grid = Grid::empty();
    for (row_idx, row) in ROWS.iter().enumerate() {
        for (col_idx, col) in COLUMNS.iter().enumerate() {
            let mut state = CellState::Empty;

            if side == BoardSide::Own
                && ships
                    .iter()
                    .any(|ship| ship.player_id == viewer_id && at(&ship.x, ship.y, row, *col))
            {
                state = CellState::Ship;
            }

            let strike = moves.iter().find(|strike| {
                let by_viewer = strike.player_id == viewer_id;
                let relevant = match side {
                    BoardSide::Own => !by_viewer,
                    BoardSide::Opponent => by_viewer,
                };
                relevant && at(&strike.x, strike.y, row, *col)
            });
            if let Some(strike) = strike {
                state = if strike.result {
                    CellState::Hit
                } else {
                    CellState::Miss
                };
            }

            grid.cells[row_idx][col_idx] = state;
        }
    }
    grid
}

fn at(x: &str, y: u32, row: &str, col: u32) -> bool {
    x == row && y == col
}

/// Cell label such as `A1` for zero-based coordinates.
pub fn cell_label(row: usize, col: usize) -> String {
    match (ROWS.get(row), COLUMNS.get(col)) {
        (Some(row), Some(col)) => format!("{row}{col}"),
        _ => String::new(),
    }
}
