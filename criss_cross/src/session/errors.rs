//! Session error types.

use super::models::{SessionId, SessionState};
use crate::{puzzle::LayoutError, services::ServiceError};
use thiserror::Error;

/// Errors returned by the session request surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No free session id within the allocation window
    #[error("Server is full")]
    CapacityExceeded,

    /// Unknown or finished session
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// Username already seated in the session
    #[error("Player {0} is already in the session")]
    DuplicatePlayer(String),

    /// Username not seated in the session
    #[error("Player {0} is not in the session")]
    PlayerNotFound(String),

    /// Guess from someone other than the active player
    #[error("It is not {0}'s turn")]
    NotYourTurn(String),

    /// Operation needs a running game
    #[error("Game is not in progress (state: {0})")]
    NotInProgress(SessionState),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Sequence number already used for a different operation
    #[error("Sequence number {seq} was already used (last applied: {watermark})")]
    StaleSequence { seq: u64, watermark: u64 },

    /// Puzzle could not be built
    #[error("Puzzle unavailable: {0}")]
    Layout(LayoutError),

    /// Account or word repository call failed
    #[error("Upstream service failure: {0}")]
    UpstreamServiceFailure(String),

    /// Session did not answer in time
    #[error("Session {0} did not respond in time")]
    Timeout(SessionId),
}

impl SessionError {
    /// Stable machine-readable code for transports
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::CapacityExceeded => "capacity_exceeded",
            SessionError::SessionNotFound(_) => "session_not_found",
            SessionError::DuplicatePlayer(_) => "duplicate_player",
            SessionError::PlayerNotFound(_) => "player_not_found",
            SessionError::NotYourTurn(_) => "not_your_turn",
            SessionError::NotInProgress(_) => "not_in_progress",
            SessionError::InvalidRequest(_) => "invalid_request",
            SessionError::StaleSequence { .. } => "stale_sequence",
            SessionError::Layout(_) => "puzzle_unavailable",
            SessionError::UpstreamServiceFailure(_) => "upstream_failure",
            SessionError::Timeout(_) => "timeout",
        }
    }
}

impl From<LayoutError> for SessionError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::Repository(msg) => SessionError::UpstreamServiceFailure(msg),
            other => SessionError::Layout(other),
        }
    }
}

impl From<ServiceError> for SessionError {
    fn from(err: ServiceError) -> Self {
        match err {
            err @ ServiceError::InvalidWord(_) => SessionError::InvalidRequest(err.to_string()),
            other => SessionError::UpstreamServiceFailure(other.client_message()),
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
