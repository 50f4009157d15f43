//! Session actor message types.

use super::{errors::SessionResult, models::GuessOutcome};
use crate::notify::CallbackHandle;
use tokio::sync::oneshot;

/// Messages that can be sent to a SessionActor
#[derive(Debug)]
pub enum SessionMessage {
    /// Seat a player
    Join {
        username: String,
        callback: CallbackHandle,
        score: i64,
        seq: u64,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Move a waiting session into play
    StartSignal {
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Guess a letter or word
    Guess {
        username: String,
        guess: String,
        seq: u64,
        response: oneshot::Sender<SessionResult<GuessOutcome>>,
    },

    /// Leave the session
    Quit {
        username: String,
        seq: u64,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Refresh a heartbeat
    Heartbeat {
        username: String,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Internal: remove players whose heartbeat expired
    Sweep { response: oneshot::Sender<usize> },
}

/// Replies remembered for duplicate requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionReply {
    Joined,
    Guessed(GuessOutcome),
    Quit,
}

impl SessionReply {
    /// Operation name for logs
    pub fn operation(&self) -> &'static str {
        match self {
            SessionReply::Joined => "join",
            SessionReply::Guessed(_) => "guess",
            SessionReply::Quit => "quit",
        }
    }
}
