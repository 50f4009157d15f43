//! Session view API handlers.
//!
//! Read-only REST views over live sessions. Game requests themselves go over the
//! WebSocket, where the server can push events back.
//!
//! # Examples
//!
//! List sessions:
//! ```bash
//! curl http://localhost:6969/api/v1/sessions
//! ```
//!
//! Current grid:
//! ```bash
//! curl http://localhost:6969/api/v1/sessions/42/puzzle
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use criss_cross::{SessionError, SessionId, SessionState, session::SessionSnapshot};
use serde::Serialize;

use super::AppState;

/// Session error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub SessionError);

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SessionError::SessionNotFound(_) | SessionError::PlayerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SessionError::DuplicatePlayer(_)
            | SessionError::NotYourTurn(_)
            | SessionError::NotInProgress(_)
            | SessionError::StaleSequence { .. } => StatusCode::CONFLICT,
            SessionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            SessionError::CapacityExceeded
            | SessionError::UpstreamServiceFailure(_)
            | SessionError::Layout(_) => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    pub id: SessionId,
    pub owner: String,
    pub state: SessionState,
    pub player_count: usize,
    pub guesses_remaining: u32,
}

impl From<&SessionSnapshot> for SessionListItem {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            owner: snapshot.owner.clone(),
            state: snapshot.state,
            player_count: snapshot.players.len(),
            guesses_remaining: snapshot.guesses_remaining,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PuzzleResponse {
    pub id: SessionId,
    pub grid: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GuessCounterResponse {
    pub id: SessionId,
    pub guesses_remaining: u32,
}

/// List live sessions, ordered by id.
///
/// # Response
///
/// Returns `200 OK`:
/// ```json
/// [
///   {
///     "id": 7,
///     "owner": "alice",
///     "state": "in_progress",
///     "player_count": 2,
///     "guesses_remaining": 12
///   }
/// ]
/// ```
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionListItem>> {
    let snapshots = state.registry.snapshots().await;
    Json(snapshots.iter().map(|s| SessionListItem::from(s.as_ref())).collect())
}

/// Full snapshot of one session.
///
/// # Errors
///
/// - `404 Not Found`: No live session with that id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state.registry.snapshot(session_id).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// Revealed grid, one string per row.
///
/// Hidden cells render as `-` and blanks as `.`.
pub async fn get_puzzle(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<PuzzleResponse>, ApiError> {
    let grid = state.registry.initial_puzzle(session_id).await?;
    Ok(Json(PuzzleResponse {
        id: session_id,
        grid: grid.lines(),
    }))
}

/// Session-wide guesses left.
pub async fn get_guess_counter(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<GuessCounterResponse>, ApiError> {
    let guesses_remaining = state.registry.guess_counter(session_id).await?;
    Ok(Json(GuessCounterResponse {
        id: session_id,
        guesses_remaining,
    }))
}
