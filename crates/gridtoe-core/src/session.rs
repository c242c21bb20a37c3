use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell, Mark};
use crate::win::{detect_winner, win_length};

/// Opaque handle for one client connection.
pub type ConnectionId = u64;

/// Smallest grid a room may be created with.
pub const MIN_GRID_SIZE: usize = 3;
/// Largest grid a room may be created with.
pub const MAX_GRID_SIZE: usize = 15;

/// Whether a grid size is accepted at room creation.
pub fn is_supported_grid_size(grid_size: usize) -> bool {
    (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size)
}

/// Win/tie counters. Survive board resets; cleared only by a score reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "X")]
    pub x: u32,
    #[serde(rename = "O")]
    pub o: u32,
    pub ties: u32,
}

impl Scores {
    fn credit(&mut self, mark: Mark) {
        match mark {
            Mark::X => self.x += 1,
            Mark::O => self.o += 1,
        }
    }
}

/// Which connection holds each seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    #[serde(rename = "X")]
    pub x: Option<ConnectionId>,
    #[serde(rename = "O")]
    pub o: Option<ConnectionId>,
}

impl Seats {
    pub fn get(&self, mark: Mark) -> Option<ConnectionId> {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    fn slot_mut(&mut self, mark: Mark) -> &mut Option<ConnectionId> {
        match mark {
            Mark::X => &mut self.x,
            Mark::O => &mut self.o,
        }
    }

    /// True when `conn` is bound to the `mark` seat.
    pub fn holds(&self, conn: ConnectionId, mark: Mark) -> bool {
        self.get(mark) == Some(conn)
    }

    /// Every seat held by `conn` (both, when one connection plays itself).
    pub fn seats_of(&self, conn: ConnectionId) -> Vec<Mark> {
        [Mark::X, Mark::O]
            .into_iter()
            .filter(|&m| self.holds(conn, m))
            .collect()
    }

    /// Bind `conn` to the first open seat, O before X. Returns the seat, or
    /// `None` when both are taken.
    pub fn claim_open(&mut self, conn: ConnectionId) -> Option<Mark> {
        let mark = [Mark::O, Mark::X]
            .into_iter()
            .find(|&m| self.get(m).is_none())?;
        *self.slot_mut(mark) = Some(conn);
        Some(mark)
    }

    /// Unbind every seat held by `conn`, returning the seats released.
    pub fn release(&mut self, conn: ConnectionId) -> Vec<Mark> {
        let released = self.seats_of(conn);
        for &mark in &released {
            *self.slot_mut(mark) = None;
        }
        released
    }
}

/// Lifecycle of one board. Mirrors the `active` flag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Finished,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No line and board not full; `next` is to move.
    Continue { next: Mark },
    Won(Mark),
    Tie,
}

/// Why a move was ignored. These never reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    OutOfRange,
    Occupied,
    Finished,
    NotYourTurn,
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "cell index out of range"),
            Self::Occupied => write!(f, "cell already occupied"),
            Self::Finished => write!(f, "game is finished"),
            Self::NotYourTurn => write!(f, "not this player's turn"),
        }
    }
}

/// Full session snapshot, broadcast after every accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub board: Vec<Cell>,
    pub current_player: Mark,
    pub active: bool,
    pub scores: Scores,
    pub seats: Seats,
    pub grid_size: usize,
    pub win_length: usize,
}

/// One room's game: board, turn, status, scores and seats.
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    win_length: usize,
    current_player: Mark,
    status: SessionStatus,
    scores: Scores,
    seats: Seats,
}

impl GameSession {
    /// New session with an empty board and the X seat bound to `creator`.
    pub fn new(grid_size: usize, creator: ConnectionId) -> Self {
        Self {
            board: Board::new(grid_size),
            win_length: win_length(grid_size),
            current_player: Mark::X,
            status: SessionStatus::InProgress,
            scores: Scores::default(),
            seats: Seats {
                x: Some(creator),
                o: None,
            },
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn grid_size(&self) -> usize {
        self.board.grid_size()
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    pub fn current_player(&self) -> Mark {
        self.current_player
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn seats(&self) -> &Seats {
        &self.seats
    }

    pub fn seats_mut(&mut self) -> &mut Seats {
        &mut self.seats
    }

    /// Validate and apply a move for `mark` at `index`.
    ///
    /// A rejected move leaves the session untouched.
    pub fn apply_move(&mut self, index: usize, mark: Mark) -> Result<MoveOutcome, MoveRejection> {
        let cell = self.board.get(index).ok_or(MoveRejection::OutOfRange)?;
        if !cell.is_empty() {
            return Err(MoveRejection::Occupied);
        }
        if self.status == SessionStatus::Finished {
            return Err(MoveRejection::Finished);
        }
        if mark != self.current_player {
            return Err(MoveRejection::NotYourTurn);
        }

        self.board.place(index, mark);

        if let Some(winner) = detect_winner(&self.board) {
            self.scores.credit(winner);
            self.status = SessionStatus::Finished;
            return Ok(MoveOutcome::Won(winner));
        }
        if self.board.is_full() {
            self.scores.ties += 1;
            self.status = SessionStatus::Finished;
            return Ok(MoveOutcome::Tie);
        }

        self.current_player = mark.other();
        Ok(MoveOutcome::Continue {
            next: self.current_player,
        })
    }

    /// Clear the board and hand the first move to X. Scores are kept.
    pub fn reset(&mut self) {
        self.board.clear();
        self.current_player = Mark::X;
        self.status = SessionStatus::InProgress;
    }

    /// Same as [`reset`](Self::reset), and zero every score counter.
    pub fn reset_scores(&mut self) {
        self.reset();
        self.scores = Scores::default();
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            board: self.board.cells().to_vec(),
            current_player: self.current_player,
            active: self.is_active(),
            scores: self.scores,
            seats: self.seats,
            grid_size: self.grid_size(),
            win_length: self.win_length,
        }
    }
}
