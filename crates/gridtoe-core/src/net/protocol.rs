use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, CreateGameMsg, CreateGameResponseMsg, ErrorMsg, GameStateMsg, JoinGameMsg,
    JoinGameResponseMsg, MakeMoveMsg, MessageType, PlayerLeftMsg, ResetGameMsg, ResetScoresMsg,
    ServerMessage,
};

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateGame(m) => encode_message(MessageType::CreateGame, m),
        ClientMessage::JoinGame(m) => encode_message(MessageType::JoinGame, m),
        ClientMessage::MakeMove(m) => encode_message(MessageType::MakeMove, m),
        ClientMessage::ResetGame(m) => encode_message(MessageType::ResetGame, m),
        ClientMessage::ResetScores(m) => encode_message(MessageType::ResetScores, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::CreateGameResponse(m) => encode_message(MessageType::CreateGameResponse, m),
        ServerMessage::JoinGameResponse(m) => encode_message(MessageType::JoinGameResponse, m),
        ServerMessage::GameState(m) => encode_message(MessageType::GameState, m),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
        ServerMessage::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CreateGame => Ok(ClientMessage::CreateGame(
            decode_payload::<CreateGameMsg>(data)?,
        )),
        MessageType::JoinGame => Ok(ClientMessage::JoinGame(decode_payload::<JoinGameMsg>(
            data,
        )?)),
        MessageType::MakeMove => Ok(ClientMessage::MakeMove(decode_payload::<MakeMoveMsg>(
            data,
        )?)),
        MessageType::ResetGame => Ok(ClientMessage::ResetGame(decode_payload::<ResetGameMsg>(
            data,
        )?)),
        MessageType::ResetScores => Ok(ClientMessage::ResetScores(decode_payload::<
            ResetScoresMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CreateGameResponse => Ok(ServerMessage::CreateGameResponse(
            decode_payload::<CreateGameResponseMsg>(data)?,
        )),
        MessageType::JoinGameResponse => Ok(ServerMessage::JoinGameResponse(decode_payload::<
            JoinGameResponseMsg,
        >(data)?)),
        MessageType::GameState => Ok(ServerMessage::GameState(Box::new(decode_payload::<
            GameStateMsg,
        >(data)?))),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        MessageType::PlayerLeft => Ok(ServerMessage::PlayerLeft(decode_payload::<
            PlayerLeftMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
