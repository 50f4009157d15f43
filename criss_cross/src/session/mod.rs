//! Session module running each puzzle as an async actor.
//!
//! This module implements:
//! - GameSession: roster, shared guess budget, turn pointer and lifecycle state
//! - TurnCoordinator: the turn state machine and the notifications it produces
//! - SessionActor: serialized mutation of one session behind an mpsc inbox
//! - SessionRegistry: id allocation, lookup, removal and the request surface
//! - RequestDeduplicator and LivenessMonitor: replay protection and heartbeat reaping
//!
//! ## Architecture
//!
//! Each session runs in a separate Tokio task. The registry owns the id table and
//! forwards requests to the owning actor, which publishes a snapshot after every
//! mutation so read-only queries never wait on the inbox.
//!
//! ## Example
//!
//! ```ignore
//! use criss_cross::{ChannelCallback, CallbackHandle, SessionConfig, SessionRegistry};
//! use criss_cross::services::{InMemoryAccountService, InMemoryWordRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let words = InMemoryWordRepository::from_words(["tea", "ten", "eat"]);
//!     let registry = SessionRegistry::new(
//!         SessionConfig::default(),
//!         Arc::new(InMemoryAccountService::new()),
//!         Arc::new(words),
//!     );
//!
//!     let (alice, mut events) = ChannelCallback::new(16);
//!     let id = registry
//!         .start_game("alice", CallbackHandle::new(&alice), 2, 2, 1)
//!         .await
//!         .unwrap();
//!     registry.issue_start_signal(id).await.unwrap();
//!     let _your_turn = events.recv().await;
//! }
//! ```

pub mod actor;
pub mod config;
pub mod dedup;
pub mod errors;
pub mod game;
pub mod liveness;
pub mod messages;
pub mod models;
pub mod registry;
pub mod turn;

pub use actor::{SessionActor, SessionHandle};
pub use config::{LivenessConfig, SessionConfig};
pub use dedup::{Admission, RequestDeduplicator};
pub use errors::{SessionError, SessionResult};
pub use game::GameSession;
pub use liveness::LivenessMonitor;
pub use messages::{SessionMessage, SessionReply};
pub use models::{
    Difficulty, GuessOutcome, PlayerSlot, SessionId, SessionSnapshot, SessionState,
};
pub use registry::{GameStart, SessionRegistry, SessionSetup};
pub use turn::{GuessTurn, QuitTurn, TurnCoordinator, Transition};
