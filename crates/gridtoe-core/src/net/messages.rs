use serde::{Deserialize, Serialize};

use crate::board::Mark;
use crate::error::{ErrorCode, SessionError};
use crate::session::SessionState;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateGame = 0x01,
    JoinGame = 0x02,
    MakeMove = 0x03,
    ResetGame = 0x04,
    ResetScores = 0x05,

    // Server -> Client
    CreateGameResponse = 0x10,
    JoinGameResponse = 0x11,
    GameState = 0x12,
    Error = 0x13,
    PlayerLeft = 0x14,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateGame),
            0x02 => Some(Self::JoinGame),
            0x03 => Some(Self::MakeMove),
            0x04 => Some(Self::ResetGame),
            0x05 => Some(Self::ResetScores),
            0x10 => Some(Self::CreateGameResponse),
            0x11 => Some(Self::JoinGameResponse),
            0x12 => Some(Self::GameState),
            0x13 => Some(Self::Error),
            0x14 => Some(Self::PlayerLeft),
            _ => None,
        }
    }

    /// Types only the server may send.
    pub fn is_server_only(self) -> bool {
        (self as u8) >= 0x10
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameMsg {
    pub grid_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameMsg {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMoveMsg {
    pub room_id: String,
    pub index: usize,
    pub player: Mark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetGameMsg {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetScoresMsg {
    pub room_id: String,
}

/// All messages a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateGame(CreateGameMsg),
    JoinGame(JoinGameMsg),
    MakeMove(MakeMoveMsg),
    ResetGame(ResetGameMsg),
    ResetScores(ResetScoresMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateGame(_) => MessageType::CreateGame,
            Self::JoinGame(_) => MessageType::JoinGame,
            Self::MakeMove(_) => MessageType::MakeMove,
            Self::ResetGame(_) => MessageType::ResetGame,
            Self::ResetScores(_) => MessageType::ResetScores,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Direct reply to a `CreateGame`. Never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponseMsg {
    pub room_id: String,
    pub role: Mark,
    pub grid_size: usize,
}

/// Direct reply to a successful `JoinGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponseMsg {
    pub success: bool,
    pub room_id: String,
    pub role: Mark,
    pub grid_size: usize,
}

/// Entire session state for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub room_id: String,
    pub state: SessionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&SessionError> for ErrorMsg {
    fn from(err: &SessionError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Sent to the remaining participants when a seated connection drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftMsg {
    pub room_id: String,
    pub role: Mark,
}

/// All messages the server can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    CreateGameResponse(CreateGameResponseMsg),
    JoinGameResponse(JoinGameResponseMsg),
    GameState(Box<GameStateMsg>),
    Error(ErrorMsg),
    PlayerLeft(PlayerLeftMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateGameResponse(_) => MessageType::CreateGameResponse,
            Self::JoinGameResponse(_) => MessageType::JoinGameResponse,
            Self::GameState(_) => MessageType::GameState,
            Self::Error(_) => MessageType::Error,
            Self::PlayerLeft(_) => MessageType::PlayerLeft,
        }
    }
}
