//! Session data models.

use crate::{notify::CallbackHandle, puzzle::Grid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::time::Instant;

/// Session identifier, unique among live sessions
pub type SessionId = u32;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    WaitingForPlayers,
    InProgress,
    Won,
    Lost,
}

impl SessionState {
    /// Won or lost
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Won | SessionState::Lost)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::WaitingForPlayers => write!(f, "waiting_for_players"),
            SessionState::InProgress => write!(f, "in_progress"),
            SessionState::Won => write!(f, "won"),
            SessionState::Lost => write!(f, "lost"),
        }
    }
}

/// Guess budget multiplier applied to the puzzle's letter count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u32);

impl Difficulty {
    /// Create a difficulty factor in `1..=max`
    pub fn new(factor: u32, max: u32) -> Result<Self, String> {
        if factor == 0 || factor > max {
            return Err(format!("Difficulty must be between 1 and {max}"));
        }
        Ok(Self(factor))
    }

    pub fn factor(self) -> u32 {
        self.0
    }

    /// Starting guess budget for a puzzle with `letters` letter cells
    pub fn guess_budget(self, letters: usize) -> u32 {
        let letters = u32::try_from(letters).unwrap_or(u32::MAX);
        self.0.saturating_mul(letters)
    }
}

/// A player seated in a session
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub username: String,

    /// Non-owning push target
    pub callback: CallbackHandle,

    /// Words credited to this player
    pub words_guessed: BTreeSet<String>,

    /// Persistent score from the account service
    pub score: i64,

    pub last_heartbeat: Instant,
}

impl PlayerSlot {
    pub fn new(username: impl Into<String>, callback: CallbackHandle, score: i64) -> Self {
        Self {
            username: username.into(),
            callback,
            words_guessed: BTreeSet::new(),
            score,
            last_heartbeat: Instant::now(),
        }
    }

    /// A delivery to this player has failed
    pub fn is_suspect(&self) -> bool {
        self.callback.is_suspect()
    }
}

/// What a guess did, returned to the guesser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessOutcome {
    /// Guess revealed something
    pub hit: bool,

    /// Words this guess solved, credited to the guesser
    pub newly_solved: Vec<String>,

    /// Every word is revealed
    pub solved: bool,

    pub guesses_remaining: u32,

    /// State after the guess
    pub state: SessionState,
}

/// Immutable view of a session, republished after every committed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub owner: String,
    pub state: SessionState,
    pub grid: Grid,
    pub guesses_remaining: u32,
    pub difficulty: Difficulty,
    pub players: Vec<String>,
    pub active_player: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_bounds() {
        assert!(Difficulty::new(0, 5).is_err());
        assert!(Difficulty::new(6, 5).is_err());
        assert_eq!(Difficulty::new(3, 5).unwrap().factor(), 3);
    }

    #[test]
    fn test_guess_budget_scales_with_letters() {
        let difficulty = Difficulty::new(2, 5).unwrap();
        assert_eq!(difficulty.guess_budget(7), 14);
    }

    #[test]
    fn test_state_display_and_terminal() {
        assert_eq!(SessionState::InProgress.to_string(), "in_progress");
        assert!(SessionState::Won.is_terminal());
        assert!(SessionState::Lost.is_terminal());
        assert!(!SessionState::WaitingForPlayers.is_terminal());
    }
}
