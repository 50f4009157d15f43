//! Turn state machine.
//!
//! `WaitingForPlayers -> InProgress -> {Won, Lost}`. The start signal moves a
//! waiting session into play; guesses decide win or loss. The coordinator
//! mutates a [`GameSession`] and says who must be told what, leaving delivery
//! to the dispatcher.

use super::{
    errors::{SessionError, SessionResult},
    game::GameSession,
    models::{GuessOutcome, SessionState},
};
use crate::notify::{GameEvent, Notification};

/// Points for the only player at the top score when the puzzle is solved
pub const SOLE_LEADER_BONUS: i64 = 2;

/// Points for each player tied at the top score when the puzzle is solved
pub const SHARED_LEADER_BONUS: i64 = 1;

/// Bonus per leader given how many players share the top score
pub fn leader_bonus(leaders: usize) -> i64 {
    if leaders == 1 {
        SOLE_LEADER_BONUS
    } else {
        SHARED_LEADER_BONUS
    }
}

/// Where a guess left the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still in progress, turn advanced
    Continue,
    Won,
    Lost,
}

/// Result of an accepted guess
#[derive(Debug)]
pub struct GuessTurn {
    pub outcome: GuessOutcome,
    pub transition: Transition,

    /// Turn notifications when the game continues. Empty on a terminal
    /// transition; terminal events are built once end-of-game scores are in.
    pub notifications: Vec<Notification>,
}

/// Result of a player leaving
#[derive(Debug)]
pub struct QuitTurn {
    /// Nobody is left; the session must be torn down
    pub roster_empty: bool,

    /// The leaving player held the turn
    pub was_active: bool,

    pub notifications: Vec<Notification>,
}

/// Applies turn rules to one session
pub struct TurnCoordinator<'a> {
    session: &'a mut GameSession,
}

impl<'a> TurnCoordinator<'a> {
    pub fn new(session: &'a mut GameSession) -> Self {
        Self { session }
    }

    /// Handle the start signal
    ///
    /// Only a waiting session starts; in any other state this is a no-op, so a
    /// repeated signal sends nothing.
    ///
    /// # Returns
    ///
    /// * `Vec<Notification>` - Game-start to everyone, then the first turn
    pub fn start(&mut self) -> Vec<Notification> {
        if !self.session.begin() {
            log::debug!(
                "Session {}: start signal ignored in state {}",
                self.session.id(),
                self.session.state()
            );
            return Vec::new();
        }

        log::info!(
            "Session {}: game started with {} players",
            self.session.id(),
            self.session.player_count()
        );

        let mut notifications: Vec<Notification> = self
            .session
            .players()
            .iter()
            .map(|p| Notification::new(p.username.clone(), GameEvent::GameStarted))
            .collect();
        notifications.extend(self.turn_notifications());
        notifications
    }

    /// Handle a guess from `username`
    ///
    /// # Returns
    ///
    /// * `SessionResult<GuessTurn>` - Outcome and transition, or why the guess was refused
    pub fn guess(&mut self, username: &str, raw_guess: &str) -> SessionResult<GuessTurn> {
        if self.session.state() != SessionState::InProgress {
            return Err(SessionError::NotInProgress(self.session.state()));
        }

        match self.session.active_player() {
            Some(active) if active.username == username => {}
            _ if !self.session.has_player(username) => {
                return Err(SessionError::PlayerNotFound(username.to_string()));
            }
            _ => return Err(SessionError::NotYourTurn(username.to_string())),
        }

        let outcome = self.session.evaluate_guess(username, raw_guess)?;

        let (transition, notifications) = match outcome.state {
            SessionState::Won => (Transition::Won, Vec::new()),
            SessionState::Lost => (Transition::Lost, Vec::new()),
            _ => {
                self.session.advance_turn();
                (Transition::Continue, self.turn_notifications())
            }
        };

        log::debug!(
            "Session {}: {} guessed '{}' (hit: {}, remaining: {}, transition: {:?})",
            self.session.id(),
            username,
            raw_guess.trim(),
            outcome.hit,
            outcome.guesses_remaining,
            transition
        );

        Ok(GuessTurn {
            outcome,
            transition,
            notifications,
        })
    }

    /// Handle a player leaving, by request or by timeout
    pub fn quit(&mut self, username: &str) -> SessionResult<QuitTurn> {
        let was_active = self
            .session
            .active_player()
            .is_some_and(|p| p.username == username);

        let roster_empty = self.session.remove_player(username)?;
        if roster_empty {
            return Ok(QuitTurn {
                roster_empty,
                was_active,
                notifications: Vec::new(),
            });
        }

        let mut notifications = Vec::new();

        if was_active
            && self.session.state() == SessionState::InProgress
            && let Some(next) = self.session.active_player()
        {
            notifications.push(Notification::new(
                next.username.clone(),
                GameEvent::YourTurn {
                    view: self.session.turn_view(&next.username),
                },
            ));
        }

        let remaining_players = self.session.player_count();
        notifications.extend(self.session.players().iter().map(|p| {
            Notification::new(
                p.username.clone(),
                GameEvent::PlayerQuit {
                    username: username.to_string(),
                    remaining_players,
                },
            )
        }));

        Ok(QuitTurn {
            roster_empty,
            was_active,
            notifications,
        })
    }

    /// Roster update after `username` joined
    ///
    /// Everyone, the newcomer included, learns the new size. Someone joining a
    /// game already underway also gets the board.
    pub fn join_notifications(&self, username: &str) -> Vec<Notification> {
        let total_players = self.session.player_count();
        let mut notifications: Vec<Notification> = self
            .session
            .players()
            .iter()
            .map(|p| {
                Notification::new(
                    p.username.clone(),
                    GameEvent::PlayerJoined {
                        username: username.to_string(),
                        total_players,
                    },
                )
            })
            .collect();

        if self.session.state() == SessionState::InProgress {
            notifications.push(Notification::new(
                username,
                GameEvent::OpponentTurn {
                    view: self.session.turn_view(username),
                },
            ));
        }

        notifications
    }

    /// Your-turn to the active player, opponent-turn to everyone else
    pub fn turn_notifications(&self) -> Vec<Notification> {
        let active = self.session.active_index();
        self.session
            .players()
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let view = self.session.turn_view(&p.username);
                let event = if index == active {
                    GameEvent::YourTurn { view }
                } else {
                    GameEvent::OpponentTurn { view }
                };
                Notification::new(p.username.clone(), event)
            })
            .collect()
    }

    /// Final win or loss event for every player
    pub fn terminal_notifications(&self) -> Vec<Notification> {
        let scoreboard = self.session.scoreboard();
        let won = self.session.state() == SessionState::Won;

        self.session
            .players()
            .iter()
            .map(|p| {
                let view = self.session.turn_view(&p.username);
                let scoreboard = scoreboard.clone();
                let event = if won {
                    GameEvent::GameWon { view, scoreboard }
                } else {
                    GameEvent::GameLost { view, scoreboard }
                };
                Notification::new(p.username.clone(), event)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notify::{CallbackHandle, ChannelCallback},
        puzzle::{PuzzleLayout, PuzzleState},
        session::models::{Difficulty, PlayerSlot},
    };

    fn slot(name: &str) -> PlayerSlot {
        let (callback, _events) = ChannelCallback::new(1);
        PlayerSlot::new(name, CallbackHandle::new(&callback), 0)
    }

    fn session(players: &[&str], budget: u32) -> GameSession {
        let puzzle =
            PuzzleState::new(PuzzleLayout::criss_cross("tea", &["ten".to_string()]).unwrap());
        let mut session = GameSession::new(
            9,
            slot(players[0]),
            puzzle,
            Difficulty::new(1, 5).unwrap(),
            budget,
        );
        for name in &players[1..] {
            session.add_player(slot(name));
        }
        session
    }

    fn events_for<'n>(notes: &'n [Notification], name: &str) -> Vec<&'n GameEvent> {
        notes
            .iter()
            .filter(|n| n.recipient == name)
            .map(|n| &n.event)
            .collect()
    }

    #[test]
    fn test_leader_bonus() {
        assert_eq!(leader_bonus(1), 2);
        assert_eq!(leader_bonus(3), 1);
    }

    #[test]
    fn test_start_notifies_then_assigns_turns() {
        let mut session = session(&["alice", "bob"], 5);
        let notes = TurnCoordinator::new(&mut session).start();

        let alice = events_for(&notes, "alice");
        assert_eq!(alice[0], &GameEvent::GameStarted);
        assert!(matches!(alice[1], GameEvent::YourTurn { .. }));

        let bob = events_for(&notes, "bob");
        assert_eq!(bob[0], &GameEvent::GameStarted);
        assert!(matches!(bob[1], GameEvent::OpponentTurn { .. }));
    }

    #[test]
    fn test_repeated_start_is_silent() {
        let mut session = session(&["alice"], 5);
        assert!(!TurnCoordinator::new(&mut session).start().is_empty());
        assert!(TurnCoordinator::new(&mut session).start().is_empty());
        assert_eq!(session.state(), SessionState::InProgress);
    }

    #[test]
    fn test_out_of_turn_guess_rejected() {
        let mut session = session(&["alice", "bob"], 5);
        let mut turns = TurnCoordinator::new(&mut session);
        turns.start();

        assert_eq!(
            turns.guess("bob", "t").unwrap_err(),
            SessionError::NotYourTurn("bob".to_string())
        );
        assert_eq!(
            turns.guess("zed", "t").unwrap_err(),
            SessionError::PlayerNotFound("zed".to_string())
        );
        assert_eq!(session.guesses_remaining(), 5);
    }

    #[test]
    fn test_turn_advances_on_hit_and_miss() {
        let mut session = session(&["alice", "bob", "carol"], 5);
        let mut turns = TurnCoordinator::new(&mut session);
        turns.start();

        turns.guess("alice", "e").unwrap();
        let turn = turns.guess("bob", "z").unwrap();
        assert_eq!(turn.transition, Transition::Continue);

        let carol = events_for(&turn.notifications, "carol");
        assert!(matches!(carol[0], GameEvent::YourTurn { .. }));
        assert_eq!(session.active_player().unwrap().username, "carol");
    }

    #[test]
    fn test_single_player_never_gets_opponent_turn() {
        let mut session = session(&["alice"], 5);
        let mut turns = TurnCoordinator::new(&mut session);
        let mut notes = turns.start();
        notes.extend(turns.guess("alice", "z").unwrap().notifications);

        assert!(
            notes
                .iter()
                .all(|n| !matches!(n.event, GameEvent::OpponentTurn { .. }))
        );
    }

    #[test]
    fn test_terminal_transition_has_no_turn_notifications() {
        let mut session = session(&["alice"], 1);
        let mut turns = TurnCoordinator::new(&mut session);
        turns.start();

        let turn = turns.guess("alice", "q").unwrap();
        assert_eq!(turn.transition, Transition::Lost);
        assert!(turn.notifications.is_empty());

        let finals = turns.terminal_notifications();
        assert!(matches!(finals[0].event, GameEvent::GameLost { .. }));
    }

    #[test]
    fn test_active_quit_hands_turn_to_next() {
        let mut session = session(&["alice", "bob", "carol"], 5);
        let mut turns = TurnCoordinator::new(&mut session);
        turns.start();

        let quit = turns.quit("alice").unwrap();
        assert!(quit.was_active);
        assert!(!quit.roster_empty);

        let bob = events_for(&quit.notifications, "bob");
        assert!(matches!(bob[0], GameEvent::YourTurn { .. }));
        assert_eq!(
            bob[1],
            &GameEvent::PlayerQuit {
                username: "alice".to_string(),
                remaining_players: 2
            }
        );
        let carol = events_for(&quit.notifications, "carol");
        assert_eq!(carol.len(), 1);
    }

    #[test]
    fn test_quit_while_waiting_sends_no_turn() {
        let mut session = session(&["alice", "bob"], 5);
        let quit = TurnCoordinator::new(&mut session).quit("alice").unwrap();

        assert_eq!(quit.notifications.len(), 1);
        assert!(matches!(
            quit.notifications[0].event,
            GameEvent::PlayerQuit { .. }
        ));
    }

    #[test]
    fn test_last_quit_empties_roster() {
        let mut session = session(&["alice"], 5);
        let quit = TurnCoordinator::new(&mut session).quit("alice").unwrap();
        assert!(quit.roster_empty);
        assert!(quit.notifications.is_empty());
    }

    #[test]
    fn test_late_joiner_gets_board() {
        let mut session = session(&["alice"], 5);
        TurnCoordinator::new(&mut session).start();
        session.add_player(slot("bob"));

        let notes = TurnCoordinator::new(&mut session).join_notifications("bob");
        let bob = events_for(&notes, "bob");
        assert_eq!(
            bob[0],
            &GameEvent::PlayerJoined {
                username: "bob".to_string(),
                total_players: 2
            }
        );
        assert!(matches!(bob[1], GameEvent::OpponentTurn { .. }));
        assert_eq!(events_for(&notes, "alice").len(), 1);
    }
}
