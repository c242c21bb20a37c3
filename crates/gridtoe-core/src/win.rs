//! Win detection on square boards of any size.

use crate::board::{Board, Mark};

/// Number of consecutive marks needed to win on a board of `grid_size`.
///
/// This is a fixed table rather than a formula: 3×3 needs three, 6×6 needs
/// four, and every other size needs five.
pub fn win_length(grid_size: usize) -> usize {
    match grid_size {
        3 => 3,
        6 => 4,
        _ => 5,
    }
}

/// Scan the board for a run of `win_length(grid_size)` identical marks.
///
/// Directions are checked in order: rows, columns, down-right diagonals,
/// down-left diagonals. Within each direction windows are visited row-major
/// by their start cell, and the first completed run wins.
pub fn detect_winner(board: &Board) -> Option<Mark> {
    let size = board.grid_size();
    let len = win_length(size);
    // No window fits when the board is narrower than the run.
    let last_start = size.checked_sub(len)?;

    // Rows: any row, start column 0..=last_start.
    for row in 0..size {
        for col in 0..=last_start {
            if let Some(mark) = run_at(board, row * size + col, 1, len) {
                return Some(mark);
            }
        }
    }

    // Columns: start row 0..=last_start, any column.
    for row in 0..=last_start {
        for col in 0..size {
            if let Some(mark) = run_at(board, row * size + col, size, len) {
                return Some(mark);
            }
        }
    }

    // Down-right diagonals.
    for row in 0..=last_start {
        for col in 0..=last_start {
            if let Some(mark) = run_at(board, row * size + col, size + 1, len) {
                return Some(mark);
            }
        }
    }

    // Down-left diagonals start at the right edge of their window.
    for row in 0..=last_start {
        for col in (len - 1)..size {
            if let Some(mark) = run_at(board, row * size + col, size - 1, len) {
                return Some(mark);
            }
        }
    }

    None
}

/// The mark at `start` if it and the next `len - 1` cells at `step` all match.
fn run_at(board: &Board, start: usize, step: usize, len: usize) -> Option<Mark> {
    let cells = board.cells();
    let first = cells[start];
    let mark = first.mark()?;
    (1..len)
        .all(|k| cells[start + k * step] == first)
        .then_some(mark)
}
