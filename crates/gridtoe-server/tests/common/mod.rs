use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use gridtoe_core::board::Mark;
use gridtoe_core::net::messages::{
    ClientMessage, CreateGameMsg, GameStateMsg, JoinGameMsg, MakeMoveMsg, ServerMessage,
};
use gridtoe_core::net::protocol::{decode_server_message, encode_client_message};

use gridtoe_server::config::ServerConfig;
use gridtoe_server::{build_app, spawn_room_sweeper};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_room_sweeper(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read the next message, which must be a GameState.
pub async fn ws_read_game_state(stream: &mut WsStream) -> GameStateMsg {
    match ws_read_server_msg(stream).await {
        ServerMessage::GameState(gs) => *gs,
        other => panic!("Expected GameState, got: {other:?}"),
    }
}

/// Create a game and return its room code.
pub async fn ws_create_game(stream: &mut WsStream, grid_size: usize) -> String {
    ws_send_client_msg(stream, &ClientMessage::CreateGame(CreateGameMsg { grid_size })).await;
    match ws_read_server_msg(stream).await {
        ServerMessage::CreateGameResponse(resp) => {
            assert_eq!(resp.role, Mark::X);
            assert_eq!(resp.grid_size, grid_size);
            resp.room_id
        },
        other => panic!("Expected CreateGameResponse, got: {other:?}"),
    }
}

pub async fn ws_join_game(stream: &mut WsStream, room_id: &str) {
    ws_send_client_msg(
        stream,
        &ClientMessage::JoinGame(JoinGameMsg {
            room_id: room_id.to_string(),
        }),
    )
    .await;
}

pub async fn ws_make_move(stream: &mut WsStream, room_id: &str, index: usize, player: Mark) {
    ws_send_client_msg(
        stream,
        &ClientMessage::MakeMove(MakeMoveMsg {
            room_id: room_id.to_string(),
            index,
            player,
        }),
    )
    .await;
}

/// Host creates a room and a guest joins it. Both streams are left with no
/// unread messages.
pub async fn two_player_game(server: &TestServer, grid_size: usize) -> (String, WsStream, WsStream) {
    let mut host = ws_connect(&server.ws_url()).await;
    let room_id = ws_create_game(&mut host, grid_size).await;

    let mut guest = ws_connect(&server.ws_url()).await;
    ws_join_game(&mut guest, &room_id).await;
    match ws_read_server_msg(&mut guest).await {
        ServerMessage::JoinGameResponse(resp) => {
            assert!(resp.success);
            assert_eq!(resp.role, Mark::O);
        },
        other => panic!("Expected JoinGameResponse, got: {other:?}"),
    }
    ws_read_game_state(&mut guest).await;
    ws_read_game_state(&mut host).await;

    (room_id, host, guest)
}
