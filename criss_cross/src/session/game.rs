//! Game session state: roster, shared guess budget, turn pointer and puzzle.

use super::{
    errors::{SessionError, SessionResult},
    models::{Difficulty, GuessOutcome, PlayerSlot, SessionId, SessionSnapshot, SessionState},
};
use crate::{
    notify::{ScoreEntry, TurnView},
    puzzle::{Grid, PuzzleState},
};
use std::{collections::BTreeSet, time::Duration};
use tokio::time::Instant;

/// One puzzle being played
///
/// Plain data with synchronous operations. Exclusive access comes from the owning
/// session actor; turn order and notifications live in the turn coordinator.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    owner: String,
    /// Join order
    players: Vec<PlayerSlot>,
    puzzle: PuzzleState,
    guesses_remaining: u32,
    active_player: usize,
    difficulty: Difficulty,
    state: SessionState,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl GameSession {
    /// Create a session seated with its owner
    ///
    /// # Arguments
    ///
    /// * `id` - Session ID
    /// * `owner` - Creating player, seated first
    /// * `puzzle` - Puzzle to solve
    /// * `difficulty` - Difficulty factor
    /// * `guess_budget` - Starting shared guess budget
    pub fn new(
        id: SessionId,
        owner: PlayerSlot,
        puzzle: PuzzleState,
        difficulty: Difficulty,
        guess_budget: u32,
    ) -> Self {
        Self {
            id,
            owner: owner.username.clone(),
            players: vec![owner],
            puzzle,
            guesses_remaining: guess_budget,
            active_player: 0,
            difficulty,
            state: SessionState::WaitingForPlayers,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn guesses_remaining(&self) -> u32 {
        self.guesses_remaining
    }

    pub fn puzzle(&self) -> &PuzzleState {
        &self.puzzle
    }

    /// Revealed grid
    pub fn grid(&self) -> &Grid {
        self.puzzle.grid()
    }

    /// Players in join order
    pub fn players(&self) -> &[PlayerSlot] {
        &self.players
    }

    pub fn player(&self, username: &str) -> Option<&PlayerSlot> {
        self.players.iter().find(|p| p.username == username)
    }

    pub fn has_player(&self, username: &str) -> bool {
        self.player(username).is_some()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn active_index(&self) -> usize {
        self.active_player
    }

    /// Player whose turn it is
    pub fn active_player(&self) -> Option<&PlayerSlot> {
        self.players.get(self.active_player)
    }

    /// Seat a player at the end of the join order
    ///
    /// # Returns
    ///
    /// * `bool` - false if the username is already seated
    pub fn add_player(&mut self, slot: PlayerSlot) -> bool {
        if self.has_player(&slot.username) {
            return false;
        }
        self.players.push(slot);
        true
    }

    /// Remove a player, keeping the turn pointer on a live player
    ///
    /// If the leaving player was active, the next player in join order becomes
    /// active (wrapping). If they sat before the active player, the pointer shifts
    /// so the same player stays active.
    ///
    /// # Returns
    ///
    /// * `SessionResult<bool>` - true if the roster is now empty
    pub fn remove_player(&mut self, username: &str) -> SessionResult<bool> {
        let index = self
            .players
            .iter()
            .position(|p| p.username == username)
            .ok_or_else(|| SessionError::PlayerNotFound(username.to_string()))?;

        self.players.remove(index);

        if self.players.is_empty() {
            self.active_player = 0;
            return Ok(true);
        }

        if index < self.active_player {
            self.active_player -= 1;
        } else if self.active_player >= self.players.len() {
            self.active_player = 0;
        }

        Ok(false)
    }

    /// Move the turn to the next player in join order
    pub(crate) fn advance_turn(&mut self) {
        if !self.players.is_empty() {
            self.active_player = (self.active_player + 1) % self.players.len();
        }
    }

    /// Enter `InProgress` from `WaitingForPlayers`
    ///
    /// # Returns
    ///
    /// * `bool` - false if the session was not waiting
    pub(crate) fn begin(&mut self) -> bool {
        if self.state != SessionState::WaitingForPlayers {
            return false;
        }
        self.state = SessionState::InProgress;
        self.active_player = 0;
        true
    }

    /// Evaluate a guess from `username`
    ///
    /// A single character is matched as a letter across all unsolved words;
    /// anything longer must equal one unsolved word. Only a miss spends the
    /// shared budget. Win and loss are decided here, right after the guess.
    ///
    /// # Returns
    ///
    /// * `SessionResult<GuessOutcome>` - Outcome, or why the guess was refused
    pub fn evaluate_guess(&mut self, username: &str, raw_guess: &str) -> SessionResult<GuessOutcome> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress(self.state));
        }

        let player_index = self
            .players
            .iter()
            .position(|p| p.username == username)
            .ok_or_else(|| SessionError::PlayerNotFound(username.to_string()))?;

        let guess = raw_guess.trim();
        let mut chars = guess.chars();
        let evaluation = match (chars.next(), chars.next()) {
            (None, _) => {
                return Err(SessionError::InvalidRequest("guess is empty".to_string()));
            }
            (Some(letter), None) => self.puzzle.guess_letter(letter),
            _ => self.puzzle.guess_word(guess),
        };

        if !evaluation.hit {
            self.guesses_remaining = self.guesses_remaining.saturating_sub(1);
        }

        self.players[player_index]
            .words_guessed
            .extend(evaluation.newly_solved.iter().cloned());

        if evaluation.solved {
            self.state = SessionState::Won;
        } else if self.guesses_remaining == 0 {
            self.state = SessionState::Lost;
        }

        Ok(GuessOutcome {
            hit: evaluation.hit,
            newly_solved: evaluation.newly_solved.into_iter().collect(),
            solved: evaluation.solved,
            guesses_remaining: self.guesses_remaining,
            state: self.state,
        })
    }

    /// Players tied at the highest persistent score
    pub fn highest_scored_players(&self) -> BTreeSet<String> {
        let Some(best) = self.players.iter().map(|p| p.score).max() else {
            return BTreeSet::new();
        };
        self.players
            .iter()
            .filter(|p| p.score == best)
            .map(|p| p.username.clone())
            .collect()
    }

    /// Replace a player's in-session score
    pub fn set_score(&mut self, username: &str, score: i64) {
        if let Some(slot) = self.players.iter_mut().find(|p| p.username == username) {
            slot.score = score;
        }
    }

    /// Refresh a player's heartbeat
    ///
    /// # Returns
    ///
    /// * `bool` - false if the player is not seated
    pub fn touch(&mut self, username: &str, now: Instant) -> bool {
        match self.players.iter_mut().find(|p| p.username == username) {
            Some(slot) => {
                slot.last_heartbeat = now;
                true
            }
            None => false,
        }
    }

    /// Players whose last heartbeat is older than `timeout`
    pub fn stale_players(&self, now: Instant, timeout: Duration) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| now.saturating_duration_since(p.last_heartbeat) > timeout)
            .map(|p| p.username.clone())
            .collect()
    }

    /// Push payload for one recipient
    pub fn turn_view(&self, username: &str) -> TurnView {
        TurnView {
            grid: self.puzzle.grid().clone(),
            guesses_left: self.guesses_remaining,
            words_guessed: self
                .player(username)
                .map(|p| p.words_guessed.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Scores in join order
    pub fn scoreboard(&self) -> Vec<ScoreEntry> {
        self.players
            .iter()
            .map(|p| ScoreEntry {
                username: p.username.clone(),
                score: p.score,
                words_guessed: p.words_guessed.len(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            state: self.state,
            grid: self.puzzle.grid().clone(),
            guesses_remaining: self.guesses_remaining,
            difficulty: self.difficulty,
            players: self.players.iter().map(|p| p.username.clone()).collect(),
            active_player: self.active_player().map(|p| p.username.clone()),
            created_at: self.created_at,
        }
    }
}
