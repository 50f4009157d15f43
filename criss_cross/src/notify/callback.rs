//! Player callbacks and the non-owning handles sessions keep to them.

use super::events::{GameEvent, ScoreEntry, TurnView};
use async_trait::async_trait;
use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Push delivery errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// Client side of the callback is gone
    #[error("Player disconnected")]
    Disconnected,

    /// Delivery failed in transit
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Result type for callback deliveries
pub type CallbackResult<T> = Result<T, CallbackError>;

/// Push surface implemented by whatever reaches a player
#[async_trait]
pub trait PlayerCallback: Send + Sync {
    async fn on_player_join(&self, username: &str, total_players: usize) -> CallbackResult<()>;

    async fn on_game_start(&self) -> CallbackResult<()>;

    async fn on_your_turn(&self, view: &TurnView) -> CallbackResult<()>;

    async fn on_opponent_turn(&self, view: &TurnView) -> CallbackResult<()>;

    async fn on_game_win(&self, view: &TurnView, scoreboard: &[ScoreEntry])
    -> CallbackResult<()>;

    async fn on_game_loss(
        &self,
        view: &TurnView,
        scoreboard: &[ScoreEntry],
    ) -> CallbackResult<()>;

    async fn on_player_quit(&self, username: &str, remaining_players: usize)
    -> CallbackResult<()>;
}

/// Route an event to the matching callback method
pub async fn deliver(callback: &dyn PlayerCallback, event: &GameEvent) -> CallbackResult<()> {
    match event {
        GameEvent::PlayerJoined {
            username,
            total_players,
        } => callback.on_player_join(username, *total_players).await,
        GameEvent::GameStarted => callback.on_game_start().await,
        GameEvent::YourTurn { view } => callback.on_your_turn(view).await,
        GameEvent::OpponentTurn { view } => callback.on_opponent_turn(view).await,
        GameEvent::GameWon { view, scoreboard } => callback.on_game_win(view, scoreboard).await,
        GameEvent::GameLost { view, scoreboard } => {
            callback.on_game_loss(view, scoreboard).await
        }
        GameEvent::PlayerQuit {
            username,
            remaining_players,
        } => {
            callback
                .on_player_quit(username, *remaining_players)
                .await
        }
    }
}

/// Non-owning reference to a player's callback
///
/// The client connection owns the callback; sessions only hold this handle. A
/// failed delivery flags the handle as suspect, which sticks until the player
/// leaves.
#[derive(Clone)]
pub struct CallbackHandle {
    target: Weak<dyn PlayerCallback>,
    suspect: Arc<AtomicBool>,
}

impl CallbackHandle {
    /// Downgrade an owned callback into a handle
    pub fn new<C: PlayerCallback + 'static>(callback: &Arc<C>) -> Self {
        let target: Weak<C> = Arc::downgrade(callback);
        Self {
            target,
            suspect: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Callback, if the client still holds it
    pub fn upgrade(&self) -> Option<Arc<dyn PlayerCallback>> {
        self.target.upgrade()
    }

    /// Both handles point at the same callback
    pub fn same_target(&self, other: &CallbackHandle) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }

    pub fn mark_suspect(&self) {
        self.suspect.store(true, Ordering::Relaxed);
    }

    /// A delivery to this callback has failed
    pub fn is_suspect(&self) -> bool {
        self.suspect.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("alive", &(self.target.strong_count() > 0))
            .field("suspect", &self.is_suspect())
            .finish()
    }
}

/// Callback that forwards every event into an mpsc channel
///
/// Used by the WebSocket transport and by tests.
pub struct ChannelCallback {
    sender: mpsc::Sender<GameEvent>,
}

impl ChannelCallback {
    /// Create a callback with a bounded event queue
    ///
    /// # Returns
    ///
    /// * `(Arc<ChannelCallback>, mpsc::Receiver<GameEvent>)` - Callback and its event stream
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<GameEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Arc::new(Self { sender }), receiver)
    }

    async fn push(&self, event: GameEvent) -> CallbackResult<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| CallbackError::Disconnected)
    }
}

#[async_trait]
impl PlayerCallback for ChannelCallback {
    async fn on_player_join(&self, username: &str, total_players: usize) -> CallbackResult<()> {
        self.push(GameEvent::PlayerJoined {
            username: username.to_string(),
            total_players,
        })
        .await
    }

    async fn on_game_start(&self) -> CallbackResult<()> {
        self.push(GameEvent::GameStarted).await
    }

    async fn on_your_turn(&self, view: &TurnView) -> CallbackResult<()> {
        self.push(GameEvent::YourTurn { view: view.clone() }).await
    }

    async fn on_opponent_turn(&self, view: &TurnView) -> CallbackResult<()> {
        self.push(GameEvent::OpponentTurn { view: view.clone() })
            .await
    }

    async fn on_game_win(
        &self,
        view: &TurnView,
        scoreboard: &[ScoreEntry],
    ) -> CallbackResult<()> {
        self.push(GameEvent::GameWon {
            view: view.clone(),
            scoreboard: scoreboard.to_vec(),
        })
        .await
    }

    async fn on_game_loss(
        &self,
        view: &TurnView,
        scoreboard: &[ScoreEntry],
    ) -> CallbackResult<()> {
        self.push(GameEvent::GameLost {
            view: view.clone(),
            scoreboard: scoreboard.to_vec(),
        })
        .await
    }

    async fn on_player_quit(
        &self,
        username: &str,
        remaining_players: usize,
    ) -> CallbackResult<()> {
        self.push(GameEvent::PlayerQuit {
            username: username.to_string(),
            remaining_players,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_routes_to_channel() {
        let (callback, mut events) = ChannelCallback::new(4);
        let event = GameEvent::PlayerQuit {
            username: "bob".to_string(),
            remaining_players: 1,
        };

        deliver(callback.as_ref(), &event).await.unwrap();

        assert_eq!(events.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_disconnected() {
        let (callback, events) = ChannelCallback::new(1);
        drop(events);

        let result = deliver(callback.as_ref(), &GameEvent::GameStarted).await;
        assert_eq!(result, Err(CallbackError::Disconnected));
    }

    #[test]
    fn test_handle_does_not_own_callback() {
        let (callback, _events) = ChannelCallback::new(1);
        let handle = CallbackHandle::new(&callback);

        assert!(handle.upgrade().is_some());
        drop(callback);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_same_target_and_suspect() {
        let (first, _a) = ChannelCallback::new(1);
        let (second, _b) = ChannelCallback::new(1);
        let handle = CallbackHandle::new(&first);

        assert!(handle.same_target(&CallbackHandle::new(&first)));
        assert!(!handle.same_target(&CallbackHandle::new(&second)));

        let copy = handle.clone();
        copy.mark_suspect();
        assert!(handle.is_suspect());
    }
}
