/// Integration tests for retried requests and misbehaving clients
///
/// Covers sequence-number replay for every mutating request and checks that a
/// broken, slow or vanished callback never holds up the other players.
mod common;

use async_trait::async_trait;
use common::{TestPlayer, registry, registry_with, tea_ten, test_config, wait_until_removed};
use criss_cross::{
    CallbackHandle, GameEvent, PlayerCallback, SessionError,
    notify::{CallbackError, CallbackResult, ScoreEntry, TurnView},
    services::InMemoryAccountService,
};
use std::{collections::HashSet, sync::Arc, time::Duration};

#[tokio::test]
async fn test_replayed_guess_is_not_applied_twice() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.issue_start_signal(id).await.unwrap();
    alice.wait_for("your_turn").await;

    let first = registry.player_guess("alice", id, "z", 5).await.unwrap();
    let replay = registry.player_guess("alice", id, "z", 5).await.unwrap();

    assert_eq!(first, replay);
    assert_eq!(first.guesses_remaining, 4);
    assert_eq!(registry.guess_counter(id).await.unwrap(), 4);

    // Only the original guess moved the turn
    assert_eq!(alice.next_event().await.kind(), "your_turn");
    alice.assert_quiet().await;
}

#[tokio::test]
async fn test_sequence_reused_for_other_operation_is_stale() {
    let registry = registry();
    let alice = TestPlayer::new("alice");
    let bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.join_game(id, "bob", bob.handle(), 3).await.unwrap();
    registry.issue_start_signal(id).await.unwrap();
    registry.player_guess("alice", id, "z", 1).await.unwrap();

    assert_eq!(
        registry.player_guess("bob", id, "t", 3).await,
        Err(SessionError::StaleSequence {
            seq: 3,
            watermark: 3
        })
    );
    assert_eq!(registry.guess_counter(id).await.unwrap(), 4);
    assert!(registry.player_guess("bob", id, "t", 4).await.unwrap().hit);
}

#[tokio::test]
async fn test_replayed_quit_is_acknowledged() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.join_game(id, "bob", bob.handle(), 1).await.unwrap();
    alice.wait_for("player_joined").await;

    registry.player_quit(id, "bob", 2).await.unwrap();
    registry.player_quit(id, "bob", 2).await.unwrap();

    assert_eq!(
        alice.next_event().await,
        GameEvent::PlayerQuit {
            username: "bob".to_string(),
            remaining_players: 1
        }
    );
    alice.assert_quiet().await;

    assert_eq!(
        registry.player_quit(id, "bob", 3).await,
        Err(SessionError::PlayerNotFound("bob".to_string()))
    );
}

#[tokio::test]
async fn test_replayed_start_game_returns_same_session() {
    let registry = registry_with(test_config(), InMemoryAccountService::new());
    let alice = TestPlayer::new("alice");

    let first = registry
        .start_game("alice", alice.handle(), 2, 1, 1)
        .await
        .unwrap();
    let replay = registry
        .start_game("alice", alice.handle(), 2, 1, 1)
        .await
        .unwrap();
    assert_eq!(first, replay);
    assert_eq!(registry.session_count().await, 1);

    let second = registry
        .start_game("alice", alice.handle(), 2, 1, 2)
        .await
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(registry.session_count().await, 2);
}

#[tokio::test]
async fn test_concurrent_duplicate_starts_open_one_session() {
    let registry = Arc::new(registry());
    let alice = TestPlayer::new("alice");

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let handle = alice.handle();
            tokio::spawn(async move { registry.open_game("alice", handle, 2, 1, 7).await })
        })
        .collect();

    let mut ids = HashSet::new();
    let mut opened = 0;
    for task in tasks {
        let start = task.await.unwrap().unwrap();
        if start.is_new() {
            opened += 1;
        }
        ids.insert(start.session_id());
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(opened, 1);
    assert_eq!(registry.session_count().await, 1);
}

#[tokio::test]
async fn test_start_record_forgotten_after_session_ends() {
    let registry = registry();
    let alice = TestPlayer::new("alice");

    let first = registry
        .start_game("alice", alice.handle(), 2, 1, 1)
        .await
        .unwrap();
    registry.player_quit(first, "alice", 2).await.unwrap();
    wait_until_removed(&registry, first).await;

    // Until a sweep runs the old id is still replayed
    assert_eq!(
        registry
            .start_game("alice", alice.handle(), 2, 1, 1)
            .await
            .unwrap(),
        first
    );

    registry.sweep().await;
    let restarted = registry
        .open_game("alice", alice.handle(), 2, 1, 1)
        .await
        .unwrap();
    assert!(restarted.is_new());
    assert!(registry.lookup(restarted.session_id()).await.is_ok());
    assert_eq!(registry.session_count().await, 1);
}

#[tokio::test]
async fn test_replayed_join_from_same_client() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    let bob_handle = bob.handle();

    assert!(registry.join_game(id, "bob", bob_handle.clone(), 1).await.unwrap());
    assert!(registry.join_game(id, "bob", bob_handle, 1).await.unwrap());

    assert_eq!(registry.snapshot(id).await.unwrap().players, vec!["alice", "bob"]);
    assert_eq!(alice.next_event().await.kind(), "player_joined");
    alice.assert_quiet().await;
}

/// Callback whose every delivery fails
struct BrokenCallback;

#[async_trait]
impl PlayerCallback for BrokenCallback {
    async fn on_player_join(&self, _: &str, _: usize) -> CallbackResult<()> {
        Err(CallbackError::Transport("connection reset".to_string()))
    }

    async fn on_game_start(&self) -> CallbackResult<()> {
        Err(CallbackError::Transport("connection reset".to_string()))
    }

    async fn on_your_turn(&self, _: &TurnView) -> CallbackResult<()> {
        Err(CallbackError::Transport("connection reset".to_string()))
    }

    async fn on_opponent_turn(&self, _: &TurnView) -> CallbackResult<()> {
        Err(CallbackError::Transport("connection reset".to_string()))
    }

    async fn on_game_win(&self, _: &TurnView, _: &[ScoreEntry]) -> CallbackResult<()> {
        Err(CallbackError::Disconnected)
    }

    async fn on_game_loss(&self, _: &TurnView, _: &[ScoreEntry]) -> CallbackResult<()> {
        Err(CallbackError::Disconnected)
    }

    async fn on_player_quit(&self, _: &str, _: usize) -> CallbackResult<()> {
        Err(CallbackError::Transport("connection reset".to_string()))
    }
}

/// Callback that never finishes a delivery
struct StalledCallback;

#[async_trait]
impl PlayerCallback for StalledCallback {
    async fn on_player_join(&self, _: &str, _: usize) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_game_start(&self) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_your_turn(&self, _: &TurnView) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_opponent_turn(&self, _: &TurnView) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_game_win(&self, _: &TurnView, _: &[ScoreEntry]) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_game_loss(&self, _: &TurnView, _: &[ScoreEntry]) -> CallbackResult<()> {
        std::future::pending().await
    }

    async fn on_player_quit(&self, _: &str, _: usize) -> CallbackResult<()> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_failing_callback_does_not_block_others() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let broken = Arc::new(BrokenCallback);
    let broken_handle = CallbackHandle::new(&broken);

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry
        .join_game(id, "bob", broken_handle.clone(), 1)
        .await
        .unwrap();
    registry.issue_start_signal(id).await.unwrap();

    assert_eq!(alice.next_event().await.kind(), "player_joined");
    assert_eq!(alice.next_event().await, GameEvent::GameStarted);
    assert_eq!(alice.next_event().await.kind(), "your_turn");

    // Bob's turn arrives even though nothing reaches him
    registry.player_guess("alice", id, "z", 1).await.unwrap();
    assert!(registry.player_guess("bob", id, "t", 2).await.unwrap().hit);

    for _ in 0..100 {
        if broken_handle.is_suspect() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(broken_handle.is_suspect());
}

#[tokio::test]
async fn test_stalled_callback_does_not_block_others() {
    let config = criss_cross::SessionConfig {
        delivery_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let registry = registry_with(config, InMemoryAccountService::new());
    let mut alice = TestPlayer::new("alice");
    let stalled = Arc::new(StalledCallback);

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry
        .join_game(id, "bob", CallbackHandle::new(&stalled), 1)
        .await
        .unwrap();
    registry.issue_start_signal(id).await.unwrap();

    assert_eq!(alice.wait_for("your_turn").await.kind(), "your_turn");
    registry.player_guess("alice", id, "z", 1).await.unwrap();
    assert_eq!(alice.next_event().await.kind(), "opponent_turn");
}

#[tokio::test]
async fn test_vanished_client_keeps_session_running() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.join_game(id, "bob", bob.handle(), 1).await.unwrap();
    drop(bob);

    registry.issue_start_signal(id).await.unwrap();
    registry.player_guess("alice", id, "z", 1).await.unwrap();

    // Bob is still seated until he quits or times out
    assert_eq!(
        registry.snapshot(id).await.unwrap().active_player.as_deref(),
        Some("bob")
    );
    assert_eq!(alice.wait_for("opponent_turn").await.kind(), "opponent_turn");
}
