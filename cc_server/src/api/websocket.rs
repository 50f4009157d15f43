//! WebSocket transport for game requests and push events.
//!
//! One connection carries every request a player makes and every event pushed to
//! them. The connection owns the player's callback; sessions only hold a weak
//! handle to it, so a closed socket never keeps a session alive.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?username=<name>`
//! 2. Server spawns a send task merging pushed events and request replies
//! 3. Incoming frames are rate limited, parsed and forwarded to the registry
//! 4. On disconnect the send task is stopped. Seats are kept: a player who
//!    never comes back is removed by the liveness sweep.
//!
//! # Client Messages
//!
//! Requests that change game state carry a per-client `seq`; a retry with the
//! same `seq` returns the original result instead of applying twice.
//!
//! ```json
//! {"type": "start_game", "seq": 1, "num_words": 4, "difficulty": 2}
//! {"type": "join_game", "seq": 1, "session_id": 7}
//! {"type": "start_signal", "session_id": 7}
//! {"type": "guess", "seq": 2, "session_id": 7, "guess": "e"}
//! {"type": "quit", "seq": 3, "session_id": 7}
//! {"type": "heartbeat", "session_id": 7}
//! {"type": "get_puzzle", "session_id": 7}
//! {"type": "get_guess_counter", "session_id": 7}
//! ```
//!
//! # Server Messages
//!
//! ```json
//! {"type": "event", "payload": {"event": "your_turn", "view": {...}}}
//! {"type": "reply", "op": "guess", "seq": 2, "data": {"hit": true, ...}}
//! {"type": "error", "op": "guess", "seq": 2, "code": "not_your_turn", "message": "..."}
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use criss_cross::{
    CallbackHandle, ChannelCallback, GameEvent, GuessOutcome, SessionId, SessionResult,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, atomic::Ordering},
    time::Instant,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{AppState, rate_limiter::ConnectionLimiter};
use crate::{
    logging,
    metrics::{self, Direction},
};

/// Pushed events buffered per connection
const EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    username: String,
}

/// Requests received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Generate a puzzle and open a session owned by the caller
    StartGame {
        seq: u64,
        num_words: usize,
        difficulty: u32,
    },
    JoinGame {
        seq: u64,
        session_id: SessionId,
    },
    /// Move a waiting session into play
    StartSignal { session_id: SessionId },
    /// A single letter or a whole word
    Guess {
        seq: u64,
        session_id: SessionId,
        guess: String,
    },
    Quit {
        seq: u64,
        session_id: SessionId,
    },
    Heartbeat { session_id: SessionId },
    GetPuzzle { session_id: SessionId },
    GetGuessCounter { session_id: SessionId },
}

impl ClientMessage {
    /// Operation name used in replies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::StartGame { .. } => "start_game",
            ClientMessage::JoinGame { .. } => "join_game",
            ClientMessage::StartSignal { .. } => "start_signal",
            ClientMessage::Guess { .. } => "guess",
            ClientMessage::Quit { .. } => "quit",
            ClientMessage::Heartbeat { .. } => "heartbeat",
            ClientMessage::GetPuzzle { .. } => "get_puzzle",
            ClientMessage::GetGuessCounter { .. } => "get_guess_counter",
        }
    }

    pub fn seq(&self) -> Option<u64> {
        match self {
            ClientMessage::StartGame { seq, .. }
            | ClientMessage::JoinGame { seq, .. }
            | ClientMessage::Guess { seq, .. }
            | ClientMessage::Quit { seq, .. } => Some(*seq),
            _ => None,
        }
    }
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pushed game event
    Event { payload: GameEvent },
    /// Successful request
    Reply {
        op: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        data: ReplyData,
    },
    /// Failed or refused request
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        op: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        code: &'static str,
        message: String,
    },
}

impl ServerMessage {
    fn refused(code: &'static str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            op: None,
            seq: None,
            code,
            message: message.into(),
        }
    }
}

/// Request-specific reply payload
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReplyData {
    Joined {
        session_id: SessionId,
        joined: bool,
    },
    Guess(GuessOutcome),
    Puzzle {
        session_id: SessionId,
        grid: Vec<String>,
    },
    GuessCounter {
        session_id: SessionId,
        guesses_remaining: u32,
    },
    Session {
        session_id: SessionId,
    },
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Upgrade an HTTP connection to the game WebSocket.
///
/// # Query Parameters
///
/// - `username`: Player name used for every request on this connection
///
/// # Response
///
/// On success, upgrades to WebSocket (101 Switching Protocols). A blank
/// username returns `400 Bad Request`.
///
/// # Example
///
/// ```javascript
/// const ws = new WebSocket('ws://localhost:6969/ws?username=alice');
/// ```
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let username = query.username.trim().to_string();
    if username.is_empty() {
        return (StatusCode::BAD_REQUEST, "username is required").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, username, state))
}

/// Drive one connection until the client goes away
async fn handle_socket(socket: WebSocket, username: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let open = state.connections.fetch_add(1, Ordering::Relaxed) + 1;
    metrics::websocket_connection_opened(open);
    info!(username = %username, "WebSocket connected");

    let mut limiter = ConnectionLimiter::default();
    let (callback, mut events) = ChannelCallback::new(EVENT_QUEUE_CAPACITY);
    let (response_tx, mut response_rx) = mpsc::channel::<String>(32);

    let send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(event) = events.recv() => encode(&ServerMessage::Event { payload: event }),
                Some(json) = response_rx.recv() => Some(json),
                else => break,
            };
            let Some(json) = frame else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_frame(Direction::Outbound);
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_frame(Direction::Inbound);

                if let Err(limit) = limiter.check() {
                    metrics::rate_limited(limit.label());
                    logging::log_rejected_request(&username, "message", &limit.to_string());
                    if let Some(json) = encode(&ServerMessage::refused("rate_limited", limit.to_string()))
                    {
                        let _ = response_tx.send(json).await;
                    }
                    continue;
                }

                debug!(username = %username, "Received message: {}", text.as_str());

                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        handle_client_message(client_msg, &username, &callback, &state).await
                    }
                    Err(e) => {
                        warn!(username = %username, "Failed to parse client message: {}", e);
                        ServerMessage::refused("invalid_message", "Invalid message format")
                    }
                };

                if let Some(json) = encode(&response)
                    && response_tx.send(json).await.is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(username = %username, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                warn!(username = %username, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    let open = state
        .connections
        .fetch_sub(1, Ordering::Relaxed)
        .saturating_sub(1);
    metrics::websocket_connection_closed(open);
    info!(username = %username, "WebSocket disconnected");
}

/// Run one request and turn its result into a reply frame
async fn handle_client_message(
    msg: ClientMessage,
    username: &str,
    callback: &Arc<ChannelCallback>,
    state: &AppState,
) -> ServerMessage {
    let op = msg.kind();
    let seq = msg.seq();
    let started = Instant::now();

    let result = dispatch(msg, username, callback, state).await;

    logging::log_session_request(username, op, started.elapsed(), result.is_ok());

    match result {
        Ok(data) => ServerMessage::Reply { op, seq, data },
        Err(e) => ServerMessage::Error {
            op: Some(op),
            seq,
            code: e.code(),
            message: e.to_string(),
        },
    }
}

async fn dispatch(
    msg: ClientMessage,
    username: &str,
    callback: &Arc<ChannelCallback>,
    state: &AppState,
) -> SessionResult<ReplyData> {
    let registry = &state.registry;

    match msg {
        ClientMessage::StartGame {
            seq,
            num_words,
            difficulty,
        } => {
            let start = registry
                .open_game(
                    username,
                    CallbackHandle::new(callback),
                    num_words,
                    difficulty,
                    seq,
                )
                .await?;
            if start.is_new() {
                metrics::game_started();
            }
            Ok(ReplyData::Session {
                session_id: start.session_id(),
            })
        }

        ClientMessage::JoinGame { seq, session_id } => {
            let joined = registry
                .join_game(session_id, username, CallbackHandle::new(callback), seq)
                .await?;
            Ok(ReplyData::Joined { session_id, joined })
        }

        ClientMessage::StartSignal { session_id } => {
            registry.issue_start_signal(session_id).await?;
            Ok(ReplyData::Session { session_id })
        }

        ClientMessage::Guess {
            seq,
            session_id,
            guess,
        } => {
            let outcome = registry
                .player_guess(username, session_id, &guess, seq)
                .await?;
            metrics::guess(outcome.hit);
            Ok(ReplyData::Guess(outcome))
        }

        ClientMessage::Quit { seq, session_id } => {
            registry.player_quit(session_id, username, seq).await?;
            Ok(ReplyData::Session { session_id })
        }

        ClientMessage::Heartbeat { session_id } => {
            registry.player_heartbeat(session_id, username).await?;
            Ok(ReplyData::Session { session_id })
        }

        ClientMessage::GetPuzzle { session_id } => {
            let grid = registry.initial_puzzle(session_id).await?;
            Ok(ReplyData::Puzzle {
                session_id,
                grid: grid.lines(),
            })
        }

        ClientMessage::GetGuessCounter { session_id } => {
            let guesses_remaining = registry.guess_counter(session_id).await?;
            Ok(ReplyData::GuessCounter {
                session_id,
                guesses_remaining,
            })
        }
    }
}
