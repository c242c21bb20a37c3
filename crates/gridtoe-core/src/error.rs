use serde::{Deserialize, Serialize};

/// Stable machine-readable error codes sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    NotYourSeat,
    InvalidGridSize,
}

/// Errors reported to the requesting connection only. Never broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    RoomNotFound(String),
    RoomFull(String),
    /// The connection tried to move for a seat it does not hold.
    NotYourSeat,
    InvalidGridSize(usize),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotYourSeat => ErrorCode::NotYourSeat,
            Self::InvalidGridSize(_) => ErrorCode::InvalidGridSize,
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound(room) => write!(f, "room not found: {room}"),
            Self::RoomFull(room) => write!(f, "room is full: {room}"),
            Self::NotYourSeat => write!(f, "connection does not hold that seat"),
            Self::InvalidGridSize(size) => write!(
                f,
                "unsupported grid size {size} (expected {}..={})",
                crate::session::MIN_GRID_SIZE,
                crate::session::MAX_GRID_SIZE
            ),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            SessionError::RoomNotFound("ABC123".into()).code(),
            ErrorCode::RoomNotFound
        );
        assert_eq!(
            SessionError::RoomFull("ABC123".into()).code(),
            ErrorCode::RoomFull
        );
        assert_eq!(SessionError::NotYourSeat.code(), ErrorCode::NotYourSeat);
        assert_eq!(
            SessionError::InvalidGridSize(99).code(),
            ErrorCode::InvalidGridSize
        );
    }

    #[test]
    fn display_includes_context() {
        assert!(
            SessionError::RoomNotFound("QWERTY".into())
                .to_string()
                .contains("QWERTY")
        );
        let msg = SessionError::InvalidGridSize(99).to_string();
        assert!(msg.contains("99"));
        assert!(msg.contains("3..=15"));
    }
}
