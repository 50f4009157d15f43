//! Push event payloads.

use crate::puzzle::Grid;
use serde::{Deserialize, Serialize};

/// Recipient-specific view of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnView {
    /// Current revealed grid
    pub grid: Grid,

    /// Session-wide guesses left
    pub guesses_left: u32,

    /// Words credited to the recipient
    pub words_guessed: Vec<String>,
}

/// One line of the final scoreboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub username: String,

    /// Persistent score after any end-of-game bonus
    pub score: i64,

    /// Words this player solved during the game
    pub words_guessed: usize,
}

/// Events pushed to players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A player joined; `total_players` counts the new roster
    PlayerJoined {
        username: String,
        total_players: usize,
    },

    /// Game left the waiting state
    GameStarted,

    /// Recipient is the active player
    YourTurn { view: TurnView },

    /// Someone else is the active player
    OpponentTurn { view: TurnView },

    /// Every word is solved
    GameWon {
        view: TurnView,
        scoreboard: Vec<ScoreEntry>,
    },

    /// Guess budget ran out
    GameLost {
        view: TurnView,
        scoreboard: Vec<ScoreEntry>,
    },

    /// A player left or timed out
    PlayerQuit {
        username: String,
        remaining_players: usize,
    },
}

impl GameEvent {
    /// Short event name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::PlayerJoined { .. } => "player_joined",
            GameEvent::GameStarted => "game_started",
            GameEvent::YourTurn { .. } => "your_turn",
            GameEvent::OpponentTurn { .. } => "opponent_turn",
            GameEvent::GameWon { .. } => "game_won",
            GameEvent::GameLost { .. } => "game_lost",
            GameEvent::PlayerQuit { .. } => "player_quit",
        }
    }

    /// Board view carried by the event, if any
    pub fn view(&self) -> Option<&TurnView> {
        match self {
            GameEvent::YourTurn { view }
            | GameEvent::OpponentTurn { view }
            | GameEvent::GameWon { view, .. }
            | GameEvent::GameLost { view, .. } => Some(view),
            _ => None,
        }
    }

    /// Terminal events end the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::GameWon { .. } | GameEvent::GameLost { .. })
    }
}
