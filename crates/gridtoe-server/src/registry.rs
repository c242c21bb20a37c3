use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use gridtoe_core::error::SessionError;
use gridtoe_core::net::messages::{ErrorMsg, ServerMessage};
use gridtoe_core::net::protocol::encode_server_message;
use gridtoe_core::session::{ConnectionId, GameSession};

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot exhaust memory; uses `Bytes` for
/// zero-copy cloning when broadcasting to several connections.
pub type ConnectionSender = mpsc::Sender<Bytes>;

/// A live client connection: its handle plus its outbound queue.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ConnectionSender,
}

impl Connection {
    /// Encode and queue a message for this connection only.
    pub fn send(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => {
                if let Err(e) = self.sender.try_send(Bytes::from(data)) {
                    tracing::debug!(
                        connection_id = self.id, error = %e,
                        "Failed to send to connection (slow or disconnected)"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    connection_id = self.id, error = %e,
                    msg_type = ?msg.message_type(),
                    "Failed to encode reply"
                );
            },
        }
    }
}

struct RoomEntry {
    session: GameSession,
    connections: HashMap<ConnectionId, ConnectionSender>,
    last_activity: Instant,
}

/// Owns every live room, keyed by room code.
///
/// Shared behind a single `RwLock` in `AppState`; every intent runs to
/// completion under the write lock, so intents on one room never interleave.
pub struct SessionRegistry {
    rooms: HashMap<String, RoomEntry>,
    next_connection_id: ConnectionId,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            next_connection_id: 1,
        }
    }

    pub fn alloc_connection_id(&mut self) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        id
    }

    /// Create a room with `creator` in the X seat. Returns the room code,
    /// regenerated until it does not collide with an existing room.
    pub fn create_room(&mut self, grid_size: usize, creator: &Connection) -> String {
        let code = generate_unique_room_code(&self.rooms);
        let mut connections = HashMap::new();
        connections.insert(creator.id, creator.sender.clone());
        self.rooms.insert(
            code.clone(),
            RoomEntry {
                session: GameSession::new(grid_size, creator.id),
                connections,
                last_activity: Instant::now(),
            },
        );
        code
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn get(&self, room: &str) -> Option<&GameSession> {
        self.rooms.get(room).map(|e| &e.session)
    }

    pub fn get_mut(&mut self, room: &str) -> Option<&mut GameSession> {
        self.rooms.get_mut(room).map(|e| &mut e.session)
    }

    /// Mark a room as active now, deferring idle cleanup.
    pub fn touch_activity(&mut self, room: &str) {
        if let Some(entry) = self.rooms.get_mut(room) {
            entry.last_activity = Instant::now();
        }
    }

    /// Add `conn` to the room's broadcast set. Returns false if no such room.
    pub fn register_connection(&mut self, room: &str, conn: &Connection) -> bool {
        match self.rooms.get_mut(room) {
            Some(entry) => {
                entry.connections.insert(conn.id, conn.sender.clone());
                entry.last_activity = Instant::now();
                true
            },
            None => false,
        }
    }

    /// Drop `conn` from the room's broadcast set. Returns the number of
    /// connections still registered, or `None` if no such room.
    pub fn remove_connection(&mut self, room: &str, conn: ConnectionId) -> Option<usize> {
        let entry = self.rooms.get_mut(room)?;
        entry.connections.remove(&conn);
        Some(entry.connections.len())
    }

    pub fn remove_room(&mut self, room: &str) -> Option<GameSession> {
        self.rooms.remove(room).map(|e| e.session)
    }

    /// Codes of every room `conn` is registered in.
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<String> {
        self.rooms
            .iter()
            .filter(|(_, e)| e.connections.contains_key(&conn))
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn connection_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |e| e.connections.len())
    }

    /// Send a message to one connection registered in `room`. Returns false
    /// when the room or connection is unknown.
    pub fn send_to(&self, room: &str, conn: ConnectionId, msg: &ServerMessage) -> bool {
        let Some(sender) = self.rooms.get(room).and_then(|e| e.connections.get(&conn)) else {
            return false;
        };
        Connection {
            id: conn,
            sender: sender.clone(),
        }
        .send(msg);
        true
    }

    /// Broadcast raw binary data to every connection in a room.
    pub fn broadcast_to_room(&self, room: &str, data: &[u8]) {
        if let Some(entry) = self.rooms.get(room) {
            let bytes = Bytes::copy_from_slice(data);
            for (&id, sender) in &entry.connections {
                if let Err(e) = sender.try_send(bytes.clone()) {
                    tracing::debug!(
                        connection_id = id, room, error = %e,
                        "Skipping broadcast to slow client"
                    );
                }
            }
        }
    }

    /// Encode a message once and broadcast it to the room.
    pub fn broadcast_message(&self, room: &str, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.broadcast_to_room(room, &data),
            Err(e) => {
                tracing::warn!(room, error = %e, "Failed to encode broadcast");
            },
        }
    }

    /// Remove rooms idle for longer than `max_idle`. Every connection still in
    /// an evicted room is sent `RoomNotFound` first, so clients stop acting on
    /// it. Returns how many rooms were removed.
    pub fn cleanup_idle_rooms(&mut self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_activity) >= max_idle)
            .map(|(code, _)| code.clone())
            .collect();

        for code in &stale {
            let notice = ServerMessage::Error(ErrorMsg::from(&SessionError::RoomNotFound(
                code.clone(),
            )));
            let conns: Vec<ConnectionId> = self
                .rooms
                .get(code)
                .map(|e| e.connections.keys().copied().collect())
                .unwrap_or_default();
            for conn in conns {
                self.send_to(code, conn, &notice);
            }
            self.rooms.remove(code);
            tracing::info!(room = %code, "Evicted idle room");
        }
        stale.len()
    }

    /// `(rooms, registered connections)` across the whole registry.
    pub fn stats(&self) -> (usize, usize) {
        let connections = self.rooms.values().map(|e| e.connections.len()).sum();
        (self.rooms.len(), connections)
    }
}

/// Generate a room code, retrying on collision with existing rooms.
fn generate_unique_room_code(existing: &HashMap<String, RoomEntry>) -> String {
    loop {
        let code = gridtoe_core::room::generate_room_code();
        if !existing.contains_key(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtoe_core::board::Mark;
    use gridtoe_core::net::protocol::decode_server_message;

    fn make_connection(reg: &mut SessionRegistry) -> (Connection, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(16);
        let id = reg.alloc_connection_id();
        (Connection { id, sender: tx }, rx)
    }

    #[test]
    fn connection_ids_are_sequential() {
        let mut reg = SessionRegistry::new();
        assert_eq!(reg.alloc_connection_id(), 1);
        assert_eq!(reg.alloc_connection_id(), 2);
    }

    #[test]
    fn create_room_binds_creator_to_x() {
        let mut reg = SessionRegistry::new();
        let (alice, _rx) = make_connection(&mut reg);
        let code = reg.create_room(5, &alice);
        assert!(gridtoe_core::room::is_valid_room_code(&code));
        assert!(reg.contains(&code));

        let session = reg.get(&code).unwrap();
        assert_eq!(session.grid_size(), 5);
        assert!(session.seats().holds(alice.id, Mark::X));
        assert_eq!(reg.connection_count(&code), 1);
        assert_eq!(reg.rooms_of(alice.id), vec![code]);
    }

    #[test]
    fn many_rooms_get_distinct_codes() {
        let mut reg = SessionRegistry::new();
        let (alice, _rx) = make_connection(&mut reg);
        let codes: std::collections::HashSet<_> =
            (0..200).map(|_| reg.create_room(3, &alice)).collect();
        assert_eq!(codes.len(), 200);
        assert_eq!(reg.stats().0, 200);
    }

    #[test]
    fn register_and_remove_connections() {
        let mut reg = SessionRegistry::new();
        let (alice, _rx1) = make_connection(&mut reg);
        let (bob, _rx2) = make_connection(&mut reg);
        let code = reg.create_room(3, &alice);

        assert!(reg.register_connection(&code, &bob));
        assert!(!reg.register_connection("NOPE00", &bob));
        assert_eq!(reg.stats(), (1, 2));

        assert_eq!(reg.remove_connection(&code, alice.id), Some(1));
        assert_eq!(reg.remove_connection(&code, bob.id), Some(0));
        assert_eq!(reg.remove_connection("NOPE00", bob.id), None);
        assert!(reg.remove_room(&code).is_some());
        assert!(!reg.contains(&code));
    }

    #[test]
    fn broadcast_reaches_every_connection_in_room_only() {
        let mut reg = SessionRegistry::new();
        let (alice, mut rx_a) = make_connection(&mut reg);
        let (bob, mut rx_b) = make_connection(&mut reg);
        let (carol, mut rx_c) = make_connection(&mut reg);
        let room = reg.create_room(3, &alice);
        reg.register_connection(&room, &bob);
        let _other = reg.create_room(3, &carol);

        reg.broadcast_to_room(&room, b"hello");
        assert_eq!(&rx_a.try_recv().unwrap()[..], b"hello");
        assert_eq!(&rx_b.try_recv().unwrap()[..], b"hello");
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn broadcast_skips_full_channels() {
        let mut reg = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let alice = Connection {
            id: reg.alloc_connection_id(),
            sender: tx,
        };
        let room = reg.create_room(3, &alice);
        reg.broadcast_to_room(&room, b"one");
        reg.broadcast_to_room(&room, b"two");
        assert_eq!(&rx.try_recv().unwrap()[..], b"one");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn connection_send_encodes_message() {
        let mut reg = SessionRegistry::new();
        let (alice, mut rx) = make_connection(&mut reg);
        let room = reg.create_room(3, &alice);
        let state = reg.get(&room).unwrap().state();
        alice.send(&ServerMessage::GameState(Box::new(
            gridtoe_core::net::messages::GameStateMsg {
                room_id: room.clone(),
                state: state.clone(),
            },
        )));
        let data = rx.try_recv().unwrap();
        match decode_server_message(&data).unwrap() {
            ServerMessage::GameState(gs) => {
                assert_eq!(gs.room_id, room);
                assert_eq!(gs.state, state);
            },
            other => panic!("Expected GameState, got {other:?}"),
        }
    }

    #[test]
    fn idle_room_cleanup_removes_stale_rooms() {
        let mut reg = SessionRegistry::new();
        let (alice, _rx) = make_connection(&mut reg);
        let code1 = reg.create_room(3, &alice);
        let code2 = reg.create_room(3, &alice);

        reg.rooms.get_mut(&code1).unwrap().last_activity =
            Instant::now() - Duration::from_secs(10);

        let removed = reg.cleanup_idle_rooms(Duration::from_secs(5));
        assert_eq!(removed, 1);
        assert!(!reg.contains(&code1));
        assert!(reg.contains(&code2));
    }

    #[test]
    fn idle_eviction_notifies_connected_players() {
        let mut reg = SessionRegistry::new();
        let (alice, mut rx_a) = make_connection(&mut reg);
        let (bob, mut rx_b) = make_connection(&mut reg);
        let room = reg.create_room(3, &alice);
        reg.register_connection(&room, &bob);
        reg.rooms.get_mut(&room).unwrap().last_activity =
            Instant::now() - Duration::from_secs(10);

        assert_eq!(reg.cleanup_idle_rooms(Duration::from_secs(5)), 1);
        assert!(!reg.contains(&room));
        assert_eq!(reg.stats(), (0, 0));

        for rx in [&mut rx_a, &mut rx_b] {
            match decode_server_message(&rx.try_recv().unwrap()).unwrap() {
                ServerMessage::Error(e) => {
                    assert_eq!(e.code, gridtoe_core::error::ErrorCode::RoomNotFound);
                    assert!(e.message.contains(&room));
                },
                other => panic!("Expected Error, got {other:?}"),
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn active_room_with_players_survives_sweep() {
        let mut reg = SessionRegistry::new();
        let (alice, mut rx_a) = make_connection(&mut reg);
        let (bob, _rx_b) = make_connection(&mut reg);
        let room = reg.create_room(3, &alice);
        reg.register_connection(&room, &bob);

        assert_eq!(reg.cleanup_idle_rooms(Duration::from_secs(5)), 0);
        assert!(reg.contains(&room));
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn touch_activity_defers_cleanup() {
        let mut reg = SessionRegistry::new();
        let (alice, _rx) = make_connection(&mut reg);
        let code = reg.create_room(3, &alice);
        reg.rooms.get_mut(&code).unwrap().last_activity =
            Instant::now() - Duration::from_secs(10);

        reg.touch_activity(&code);
        assert_eq!(reg.cleanup_idle_rooms(Duration::from_secs(5)), 0);
        assert!(reg.contains(&code));
    }

    #[test]
    fn send_to_targets_one_registered_connection() {
        let mut reg = SessionRegistry::new();
        let (alice, mut rx_a) = make_connection(&mut reg);
        let (bob, mut rx_b) = make_connection(&mut reg);
        let room = reg.create_room(3, &alice);
        reg.register_connection(&room, &bob);

        let msg = ServerMessage::PlayerLeft(gridtoe_core::net::messages::PlayerLeftMsg {
            room_id: room.clone(),
            role: Mark::X,
        });
        assert!(reg.send_to(&room, bob.id, &msg));
        assert!(!reg.send_to(&room, 99, &msg));
        assert!(!reg.send_to("NOPE00", bob.id, &msg));

        assert!(rx_a.try_recv().is_err());
        assert_eq!(decode_server_message(&rx_b.try_recv().unwrap()).unwrap(), msg);
    }
}
