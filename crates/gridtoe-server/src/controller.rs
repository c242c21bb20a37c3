//! Intent handlers. Each runs entirely under the registry write lock, so the
//! validate-mutate-broadcast sequence for one intent is never interleaved
//! with another intent on the same room.

use gridtoe_core::board::Mark;
use gridtoe_core::error::SessionError;
use gridtoe_core::net::messages::{
    ClientMessage, CreateGameResponseMsg, ErrorMsg, GameStateMsg, JoinGameResponseMsg,
    PlayerLeftMsg, ServerMessage,
};
use gridtoe_core::room::is_valid_room_code;
use gridtoe_core::session::{ConnectionId, MoveOutcome, is_supported_grid_size};

use crate::registry::{Connection, SessionRegistry};

/// Route a decoded client message to its handler. Errors are replied to the
/// requester only.
pub fn dispatch(registry: &mut SessionRegistry, conn: &Connection, msg: ClientMessage) {
    let result = match msg {
        ClientMessage::CreateGame(m) => create_game(registry, conn, m.grid_size).map(|_| ()),
        ClientMessage::JoinGame(m) => join_game(registry, conn, &m.room_id).map(|_| ()),
        ClientMessage::MakeMove(m) => make_move(registry, conn, &m.room_id, m.index, m.player),
        ClientMessage::ResetGame(m) => {
            reset_game(registry, &m.room_id);
            Ok(())
        },
        ClientMessage::ResetScores(m) => {
            reset_scores(registry, &m.room_id);
            Ok(())
        },
    };

    if let Err(e) = result {
        tracing::debug!(connection_id = conn.id, error = %e, "Intent refused");
        conn.send(&ServerMessage::Error(ErrorMsg::from(&e)));
    }
}

/// Open a new room with the requester in the X seat. Replies with the room
/// code; nothing is broadcast.
pub fn create_game(
    registry: &mut SessionRegistry,
    conn: &Connection,
    grid_size: usize,
) -> Result<String, SessionError> {
    if !is_supported_grid_size(grid_size) {
        return Err(SessionError::InvalidGridSize(grid_size));
    }

    let room_id = registry.create_room(grid_size, conn);
    conn.send(&ServerMessage::CreateGameResponse(CreateGameResponseMsg {
        room_id: room_id.clone(),
        role: Mark::X,
        grid_size,
    }));

    tracing::info!(connection_id = conn.id, room = %room_id, grid_size, "Game created");
    Ok(room_id)
}

/// Seat the requester in the first open seat, then broadcast the new state.
pub fn join_game(
    registry: &mut SessionRegistry,
    conn: &Connection,
    room_id: &str,
) -> Result<Mark, SessionError> {
    if !is_valid_room_code(room_id) {
        return Err(SessionError::RoomNotFound(room_id.to_string()));
    }
    let session = registry
        .get_mut(room_id)
        .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
    let role = session
        .seats_mut()
        .claim_open(conn.id)
        .ok_or_else(|| SessionError::RoomFull(room_id.to_string()))?;
    let grid_size = session.grid_size();

    registry.register_connection(room_id, conn);
    conn.send(&ServerMessage::JoinGameResponse(JoinGameResponseMsg {
        success: true,
        room_id: room_id.to_string(),
        role,
        grid_size,
    }));
    broadcast_state(registry, room_id);

    tracing::info!(connection_id = conn.id, room = %room_id, %role, "Player joined");
    Ok(role)
}

/// Apply a move for `player`. The requester must hold that seat. Every other
/// invalid move is dropped without a reply.
pub fn make_move(
    registry: &mut SessionRegistry,
    conn: &Connection,
    room_id: &str,
    index: usize,
    player: Mark,
) -> Result<(), SessionError> {
    let Some(session) = registry.get_mut(room_id) else {
        tracing::debug!(connection_id = conn.id, room = %room_id, "Move for unknown room");
        return Ok(());
    };
    if !session.seats().holds(conn.id, player) {
        return Err(SessionError::NotYourSeat);
    }

    match session.apply_move(index, player) {
        Ok(outcome) => {
            match outcome {
                MoveOutcome::Won(winner) => {
                    tracing::info!(room = %room_id, %winner, "Game won");
                },
                MoveOutcome::Tie => tracing::info!(room = %room_id, "Game tied"),
                MoveOutcome::Continue { .. } => {},
            }
            registry.touch_activity(room_id);
            broadcast_state(registry, room_id);
        },
        Err(rejection) => {
            tracing::debug!(
                connection_id = conn.id, room = %room_id, index, %player,
                reason = %rejection,
                "Move ignored"
            );
        },
    }
    Ok(())
}

/// Clear the board, keeping scores. No-op for an unknown room.
pub fn reset_game(registry: &mut SessionRegistry, room_id: &str) {
    let Some(session) = registry.get_mut(room_id) else {
        return;
    };
    session.reset();
    registry.touch_activity(room_id);
    broadcast_state(registry, room_id);
}

/// Clear the board and zero the scores. No-op for an unknown room.
pub fn reset_scores(registry: &mut SessionRegistry, room_id: &str) {
    let Some(session) = registry.get_mut(room_id) else {
        return;
    };
    session.reset_scores();
    registry.touch_activity(room_id);
    broadcast_state(registry, room_id);
}

/// Release everything `conn` held. Remaining participants get a
/// `PlayerLeft` per released seat followed by the full state; a room left
/// with no connections is removed.
pub fn on_disconnect(registry: &mut SessionRegistry, conn: ConnectionId) {
    for room_id in registry.rooms_of(conn) {
        let released = registry
            .get_mut(&room_id)
            .map(|s| s.seats_mut().release(conn))
            .unwrap_or_default();

        match registry.remove_connection(&room_id, conn) {
            Some(0) => {
                registry.remove_room(&room_id);
                tracing::info!(connection_id = conn, room = %room_id, "Room closed");
            },
            Some(_) => {
                for &role in &released {
                    tracing::info!(connection_id = conn, room = %room_id, %role, "Seat released");
                    registry.broadcast_message(
                        &room_id,
                        &ServerMessage::PlayerLeft(PlayerLeftMsg {
                            room_id: room_id.clone(),
                            role,
                        }),
                    );
                }
                broadcast_state(registry, &room_id);
            },
            None => {},
        }
    }
}

fn broadcast_state(registry: &SessionRegistry, room_id: &str) {
    if let Some(session) = registry.get(room_id) {
        registry.broadcast_message(
            room_id,
            &ServerMessage::GameState(Box::new(GameStateMsg {
                room_id: room_id.to_string(),
                state: session.state(),
            })),
        );
    }
}
