//! # Criss Cross
//!
//! A multiplayer, turn-based criss-cross word puzzle engine.
//!
//! Players start or join a shared puzzle session, take turns guessing letters or
//! whole words, and are pushed notifications as the game progresses. Every session
//! runs as its own actor task so mutations on one puzzle are serialized while
//! different puzzles proceed concurrently.
//!
//! ## Architecture
//!
//! - **Puzzle**: layout (a vertical stem crossed by horizontal words) and guess evaluation
//! - **Session**: roster, shared guess budget, turn pointer and lifecycle state
//! - **Notify**: per-recipient delivery lanes over non-owning player callbacks
//! - **Dedup / Liveness**: sequence-number replay protection and heartbeat reaping
//! - **Registry**: session id allocation, lookup and teardown
//!
//! ## Core Modules
//!
//! - [`puzzle`]: Grid, layout generation and the guess engine
//! - [`session`]: Game sessions, turn state machine, actors and the registry
//! - [`notify`]: Push events, callbacks and the dispatcher
//! - [`services`]: Account score and word repository collaborators
//! - [`db`]: PostgreSQL connection pooling and the persistent account store
//!
//! ## Example
//!
//! ```
//! use criss_cross::puzzle::{PuzzleLayout, PuzzleState};
//!
//! let layout = PuzzleLayout::criss_cross("tea", &["ten".to_string()]).unwrap();
//! let mut puzzle = PuzzleState::new(layout);
//! let eval = puzzle.guess_word("tea");
//! assert!(eval.hit);
//! ```

/// PostgreSQL connection pooling and persistent stores.
pub mod db;

/// Push events, player callbacks and notification fan-out.
pub mod notify;

/// Puzzle grid, layout and guess evaluation.
pub mod puzzle;

/// External collaborators: account scores and the word dictionary.
pub mod services;

/// Game sessions, turn coordination, request dedup, liveness and the registry.
pub mod session;

pub use notify::{CallbackHandle, ChannelCallback, GameEvent, PlayerCallback};
pub use puzzle::{Grid, PuzzleLayout, PuzzleState};
pub use session::{
    Difficulty, GameStart, GuessOutcome, SessionConfig, SessionError, SessionId, SessionRegistry,
    SessionResult, SessionSetup, SessionState,
};
