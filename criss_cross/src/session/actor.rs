//! Session actor implementation with async message handling.

use super::{
    config::SessionConfig,
    dedup::{Admission, RequestDeduplicator},
    errors::{SessionError, SessionResult},
    game::GameSession,
    messages::{SessionMessage, SessionReply},
    models::{GuessOutcome, PlayerSlot, SessionId, SessionSnapshot},
    turn::{Transition, TurnCoordinator, leader_bonus},
};
use crate::{
    notify::{CallbackHandle, NotificationDispatcher},
    services::{AccountService, bounded},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{RwLock, mpsc, oneshot, watch},
    time::{Instant, timeout},
};
use uuid::Uuid;

/// Shared id -> session table
pub type SessionTable = Arc<RwLock<HashMap<SessionId, SessionHandle>>>;

/// Session actor handle for sending messages
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    snapshot: watch::Receiver<Arc<SessionSnapshot>>,
    session_id: SessionId,
    /// Distinguishes actors that reuse a recycled id
    instance: Uuid,
}

impl SessionHandle {
    /// Get session ID
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Latest committed state
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the session
    pub async fn send(&self, message: SessionMessage) -> SessionResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| SessionError::SessionNotFound(self.session_id))
    }

    /// Send a message and wait for its reply, bounded by `deadline`
    ///
    /// # Arguments
    ///
    /// * `deadline` - Longest wait for enqueueing and answering
    /// * `build` - Builds the message around the reply channel
    ///
    /// # Returns
    ///
    /// * `SessionResult<T>` - Reply, `SessionNotFound` if the actor is gone, or `Timeout`
    pub async fn request<T>(
        &self,
        deadline: Duration,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> SessionResult<T> {
        let (tx, rx) = oneshot::channel();
        let exchange = async {
            self.send(build(tx)).await?;
            rx.await
                .map_err(|_| SessionError::SessionNotFound(self.session_id))
        };

        timeout(deadline, exchange)
            .await
            .map_err(|_| SessionError::Timeout(self.session_id))?
    }
}

/// Session actor owning a single game
///
/// Messages are handled one at a time, which is what keeps roster, turn pointer
/// and guess budget consistent. Notifications are queued on delivery lanes after
/// each change commits, so no client callback runs inside the actor.
pub struct SessionActor {
    id: SessionId,
    instance: Uuid,
    session: GameSession,
    inbox: mpsc::Receiver<SessionMessage>,
    dispatcher: NotificationDispatcher,
    dedup: RequestDeduplicator<SessionReply>,
    accounts: Arc<dyn AccountService>,
    table: SessionTable,
    snapshot: watch::Sender<Arc<SessionSnapshot>>,
    service_timeout: Duration,
    heartbeat_timeout: Duration,
    is_closed: bool,
}

impl SessionActor {
    /// Create a new session actor
    ///
    /// # Arguments
    ///
    /// * `session` - Game with its owner already seated
    /// * `config` - Session configuration
    /// * `accounts` - Account service for end-of-game bonuses
    /// * `table` - Registry table the actor removes itself from when done
    ///
    /// # Returns
    ///
    /// * `(SessionActor, SessionHandle)` - Actor and handle for sending messages
    pub fn new(
        session: GameSession,
        config: &SessionConfig,
        accounts: Arc<dyn AccountService>,
        table: SessionTable,
    ) -> (Self, SessionHandle) {
        let id = session.id();
        let instance = Uuid::new_v4();
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);
        let (snapshot, snapshot_rx) = watch::channel(Arc::new(session.snapshot()));

        let mut dispatcher =
            NotificationDispatcher::new(id, config.delivery_timeout, config.lane_capacity);
        for player in session.players() {
            dispatcher.register(&player.username, player.callback.clone());
        }

        let actor = Self {
            id,
            instance,
            session,
            inbox,
            dispatcher,
            dedup: RequestDeduplicator::new(config.dedup_history),
            accounts,
            table,
            snapshot,
            service_timeout: config.service_timeout,
            heartbeat_timeout: config.liveness.timeout(),
            is_closed: false,
        };

        let handle = SessionHandle {
            sender,
            snapshot: snapshot_rx,
            session_id: id,
            instance,
        };

        (actor, handle)
    }

    /// Run the session actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Session {} starting (owner {})",
            self.id,
            self.session.owner()
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;

            if self.is_closed {
                break;
            }
        }

        log::info!("Session {} closed ({})", self.id, self.session.state());
    }

    /// Handle a session message
    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Join {
                username,
                callback,
                score,
                seq,
                response,
            } => {
                let result = self.handle_join(username, callback, score, seq);
                let _ = response.send(result);
            }

            SessionMessage::StartSignal { response } => {
                self.handle_start_signal();
                let _ = response.send(Ok(()));
            }

            SessionMessage::Guess {
                username,
                guess,
                seq,
                response,
            } => {
                let result = self.handle_guess(&username, &guess, seq).await;
                let _ = response.send(result);
            }

            SessionMessage::Quit {
                username,
                seq,
                response,
            } => {
                let result = self.handle_quit(&username, seq).await;
                let _ = response.send(result);
            }

            SessionMessage::Heartbeat { username, response } => {
                let result = if self.session.touch(&username, Instant::now()) {
                    Ok(())
                } else {
                    Err(SessionError::PlayerNotFound(username))
                };
                let _ = response.send(result);
            }

            SessionMessage::Sweep { response } => {
                let reaped = self.handle_sweep().await;
                let _ = response.send(reaped);
            }
        }
    }

    /// Handle join request
    fn handle_join(
        &mut self,
        username: String,
        callback: CallbackHandle,
        score: i64,
        seq: u64,
    ) -> SessionResult<()> {
        if let Admission::Duplicate { reply, watermark } = self.dedup.check(&username, seq) {
            let same_client = self
                .session
                .player(&username)
                .is_some_and(|p| p.callback.same_target(&callback));

            log::debug!(
                "Session {}: duplicate join from {} (seq {}, recorded {})",
                self.id,
                username,
                seq,
                reply.operation()
            );

            return match reply {
                SessionReply::Joined if same_client => Ok(()),
                _ if self.session.has_player(&username) && !same_client => {
                    Err(SessionError::DuplicatePlayer(username))
                }
                _ => Err(SessionError::StaleSequence { seq, watermark }),
            };
        }

        let slot = PlayerSlot::new(username.clone(), callback.clone(), score);
        if !self.session.add_player(slot) {
            log::debug!(
                "Session {}: rejected join, {} is already seated",
                self.id,
                username
            );
            return Err(SessionError::DuplicatePlayer(username));
        }

        self.dispatcher.register(&username, callback);
        self.dedup.record(&username, seq, SessionReply::Joined);

        let notifications = TurnCoordinator::new(&mut self.session).join_notifications(&username);
        self.publish();
        self.dispatcher.dispatch(notifications);

        log::info!(
            "Session {}: {} joined ({} players)",
            self.id,
            username,
            self.session.player_count()
        );

        Ok(())
    }

    /// Handle start signal
    fn handle_start_signal(&mut self) {
        let notifications = TurnCoordinator::new(&mut self.session).start();
        if notifications.is_empty() {
            return;
        }
        self.publish();
        self.dispatcher.dispatch(notifications);
    }

    /// Handle guess request
    async fn handle_guess(
        &mut self,
        username: &str,
        guess: &str,
        seq: u64,
    ) -> SessionResult<GuessOutcome> {
        self.session.touch(username, Instant::now());

        if let Admission::Duplicate { reply, watermark } = self.dedup.check(username, seq) {
            log::debug!(
                "Session {}: replaying guess from {} (seq {})",
                self.id,
                username,
                seq
            );
            return match reply {
                SessionReply::Guessed(outcome) => Ok(outcome),
                _ => Err(SessionError::StaleSequence { seq, watermark }),
            };
        }

        let turn = TurnCoordinator::new(&mut self.session).guess(username, guess)?;
        self.dedup
            .record(username, seq, SessionReply::Guessed(turn.outcome.clone()));

        match turn.transition {
            Transition::Continue => {
                self.publish();
                self.dispatcher.dispatch(turn.notifications);
            }
            Transition::Won => {
                self.award_bonus().await;
                self.finish().await;
            }
            Transition::Lost => {
                self.finish().await;
            }
        }

        Ok(turn.outcome)
    }

    /// Handle quit request
    async fn handle_quit(&mut self, username: &str, seq: u64) -> SessionResult<()> {
        if let Admission::Duplicate { reply, watermark } = self.dedup.check(username, seq) {
            return match reply {
                SessionReply::Quit => Ok(()),
                _ => Err(SessionError::StaleSequence { seq, watermark }),
            };
        }

        self.remove_player(username, "quit").await?;
        self.dedup.record(username, seq, SessionReply::Quit);
        Ok(())
    }

    /// Remove every player whose heartbeat expired
    async fn handle_sweep(&mut self) -> usize {
        let stale = self
            .session
            .stale_players(Instant::now(), self.heartbeat_timeout);
        let mut reaped = 0;

        for username in stale {
            if self.is_closed {
                break;
            }
            if self
                .remove_player(&username, "heartbeat timeout")
                .await
                .is_ok()
            {
                // a reconnecting client may restart its sequence numbers
                self.dedup.forget(&username);
                reaped += 1;
            }
        }

        reaped
    }

    /// Shared leave path for explicit quits and timeouts
    async fn remove_player(&mut self, username: &str, reason: &str) -> SessionResult<()> {
        let quit = TurnCoordinator::new(&mut self.session).quit(username)?;
        self.dispatcher.unregister(username);

        log::info!(
            "Session {}: {} left ({}), {} players remain",
            self.id,
            username,
            reason,
            self.session.player_count()
        );

        self.publish();
        if quit.roster_empty {
            self.teardown().await;
            return Ok(());
        }

        self.dispatcher.dispatch(quit.notifications);
        Ok(())
    }

    /// Credit the end-of-game bonus to the top-scored players
    ///
    /// Account failures are logged; the in-session score only changes when the
    /// account service confirms the new total.
    async fn award_bonus(&mut self) {
        let leaders = self.session.highest_scored_players();
        let bonus = leader_bonus(leaders.len());

        for username in leaders {
            let credit = bounded(
                self.service_timeout,
                self.accounts.update_user_score(&username, bonus),
            )
            .await;

            match credit {
                Ok(score) => {
                    log::info!(
                        "Session {}: credited {} points to {} (total {})",
                        self.id,
                        bonus,
                        username,
                        score
                    );
                    self.session.set_score(&username, score);
                }
                Err(e) => {
                    log::warn!(
                        "Session {}: failed to credit {} points to {}: {}",
                        self.id,
                        bonus,
                        username,
                        e
                    );
                }
            }
        }
    }

    /// Publish and dispatch the terminal events, then tear down
    async fn finish(&mut self) {
        let notifications = TurnCoordinator::new(&mut self.session).terminal_notifications();
        self.publish();
        self.dispatcher.dispatch(notifications);

        log::info!(
            "Session {} finished: {} with {} guesses left",
            self.id,
            self.session.state(),
            self.session.guesses_remaining()
        );

        self.teardown().await;
    }

    /// Remove this session from the registry and stop
    async fn teardown(&mut self) {
        self.is_closed = true;

        let mut table = self.table.write().await;
        let ours = table
            .get(&self.id)
            .is_some_and(|handle| handle.instance == self.instance);
        if ours {
            table.remove(&self.id);
            log::debug!("Session {} removed from registry", self.id);
        }
    }

    fn publish(&self) {
        self.snapshot
            .send_replace(Arc::new(self.session.snapshot()));
    }
}
