/// Integration tests for game flow scenarios
///
/// These tests drive sessions through the registry the way a transport would:
/// create or join, start, guess and quit, checking both the replies and the
/// events pushed to every player.
mod common;

use common::{TestPlayer, registry, registry_with, tea_ten, test_config, wait_until_removed};
use criss_cross::{
    GameEvent, SessionError, SessionState,
    services::{AccountService, InMemoryAccountService},
};
use std::sync::Arc;

#[tokio::test]
async fn test_single_player_solves_puzzle_and_earns_bonus() {
    let accounts = Arc::new(InMemoryAccountService::new());
    let registry = criss_cross::SessionRegistry::new(
        test_config(),
        accounts.clone(),
        Arc::new(criss_cross::services::InMemoryWordRepository::new()),
    );
    let mut alice = TestPlayer::new("alice");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(3))
        .await
        .unwrap();
    registry.issue_start_signal(id).await.unwrap();

    assert_eq!(alice.next_event().await, GameEvent::GameStarted);
    assert_eq!(alice.next_event().await.kind(), "your_turn");

    let first = registry.player_guess("alice", id, "tea", 1).await.unwrap();
    assert!(first.hit);
    assert_eq!(first.newly_solved, vec!["tea".to_string()]);
    assert_eq!(first.guesses_remaining, 3);
    assert_eq!(first.state, SessionState::InProgress);

    // Alone in the session, the turn comes straight back
    assert_eq!(alice.next_event().await.kind(), "your_turn");

    let second = registry.player_guess("alice", id, "ten", 2).await.unwrap();
    assert!(second.solved);
    assert_eq!(second.state, SessionState::Won);

    match alice.next_event().await {
        GameEvent::GameWon { view, scoreboard } => {
            assert_eq!(view.grid.lines(), vec!["ten", "e..", "a.."]);
            assert_eq!(view.words_guessed, vec!["tea", "ten"]);
            assert_eq!(scoreboard.len(), 1);
            assert_eq!(scoreboard[0].score, 2);
            assert_eq!(scoreboard[0].words_guessed, 2);
        }
        other => panic!("expected game_won, got {:?}", other),
    }

    assert_eq!(accounts.user_score("alice").await.unwrap(), 2);
    wait_until_removed(&registry, id).await;
    assert_eq!(
        registry.player_guess("alice", id, "t", 3).await,
        Err(SessionError::SessionNotFound(id))
    );
}

#[tokio::test]
async fn test_exhausted_budget_loses_for_everyone() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let mut bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(2))
        .await
        .unwrap();
    assert!(registry.join_game(id, "bob", bob.handle(), 1).await.unwrap());
    registry.issue_start_signal(id).await.unwrap();

    let miss = registry.player_guess("alice", id, "z", 1).await.unwrap();
    assert!(!miss.hit);
    assert_eq!(miss.guesses_remaining, 1);

    let last = registry.player_guess("bob", id, "q", 2).await.unwrap();
    assert_eq!(last.guesses_remaining, 0);
    assert_eq!(last.state, SessionState::Lost);

    let (GameEvent::GameLost { view: a, .. }, GameEvent::GameLost { view: b, .. }) =
        (alice.wait_for("game_lost").await, bob.wait_for("game_lost").await)
    else {
        unreachable!()
    };
    assert_eq!(a.grid, b.grid);
    assert_eq!(a.grid.lines(), vec!["---", "-..", "-.."]);
    assert_eq!(a.guesses_left, 0);

    wait_until_removed(&registry, id).await;
}

#[tokio::test]
async fn test_duplicate_username_join_is_refused() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let mut bob = TestPlayer::new("bob");
    let mut impostor = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    assert!(registry.join_game(id, "bob", bob.handle(), 1).await.unwrap());

    assert!(!registry.join_game(id, "bob", impostor.handle(), 7).await.unwrap());
    assert!(!registry.join_game(id, "alice", impostor.handle(), 1).await.unwrap());

    let snapshot = registry.snapshot(id).await.unwrap();
    assert_eq!(snapshot.players, vec!["alice", "bob"]);

    assert_eq!(
        alice.next_event().await,
        GameEvent::PlayerJoined {
            username: "bob".to_string(),
            total_players: 2
        }
    );
    alice.assert_quiet().await;
    assert_eq!(bob.next_event().await.kind(), "player_joined");
    bob.assert_quiet().await;
    impostor.assert_quiet().await;
}

#[tokio::test]
async fn test_active_player_quit_passes_turn() {
    let registry = registry();
    let mut alice = TestPlayer::new("alice");
    let mut bob = TestPlayer::new("bob");
    let mut carol = TestPlayer::new("carol");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.join_game(id, "bob", bob.handle(), 1).await.unwrap();
    registry.join_game(id, "carol", carol.handle(), 1).await.unwrap();
    registry.issue_start_signal(id).await.unwrap();
    assert_eq!(bob.wait_for("opponent_turn").await.kind(), "opponent_turn");
    assert_eq!(carol.wait_for("opponent_turn").await.kind(), "opponent_turn");

    registry.player_quit(id, "alice", 1).await.unwrap();

    assert_eq!(bob.next_event().await.kind(), "your_turn");
    let quit = GameEvent::PlayerQuit {
        username: "alice".to_string(),
        remaining_players: 2,
    };
    assert_eq!(bob.next_event().await, quit);
    assert_eq!(carol.next_event().await, quit);
    carol.assert_quiet().await;

    let snapshot = registry.snapshot(id).await.unwrap();
    assert_eq!(snapshot.players, vec!["bob", "carol"]);
    assert_eq!(snapshot.active_player.as_deref(), Some("bob"));
    assert_eq!(
        registry.player_guess("carol", id, "e", 2).await,
        Err(SessionError::NotYourTurn("carol".to_string()))
    );
    assert!(registry.player_guess("bob", id, "e", 2).await.unwrap().hit);
}

#[tokio::test]
async fn test_last_player_quit_removes_session() {
    let registry = registry();
    let alice = TestPlayer::new("alice");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.player_quit(id, "alice", 1).await.unwrap();

    wait_until_removed(&registry, id).await;
    assert_eq!(registry.session_count().await, 0);
}

#[tokio::test]
async fn test_guess_rules_before_and_during_play() {
    let registry = registry();
    let alice = TestPlayer::new("alice");
    let bob = TestPlayer::new("bob");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.join_game(id, "bob", bob.handle(), 1).await.unwrap();

    assert_eq!(
        registry.player_guess("alice", id, "t", 1).await,
        Err(SessionError::NotInProgress(SessionState::WaitingForPlayers))
    );

    registry.issue_start_signal(id).await.unwrap();
    // A second signal changes nothing
    registry.issue_start_signal(id).await.unwrap();

    assert_eq!(
        registry.player_guess("bob", id, "t", 2).await,
        Err(SessionError::NotYourTurn("bob".to_string()))
    );
    assert_eq!(
        registry.player_guess("mallory", id, "t", 1).await,
        Err(SessionError::PlayerNotFound("mallory".to_string()))
    );
    assert!(matches!(
        registry.player_guess("alice", id, "   ", 2).await,
        Err(SessionError::InvalidRequest(_))
    ));
    assert_eq!(registry.guess_counter(id).await.unwrap(), 5);

    let hit = registry.player_guess("alice", id, "E", 3).await.unwrap();
    assert!(hit.hit);
    assert_eq!(hit.guesses_remaining, 5);
    assert_eq!(
        registry.initial_puzzle(id).await.unwrap().lines(),
        vec!["-e-", "e..", "-.."]
    );
}

#[tokio::test]
async fn test_late_joiner_sees_board() {
    let registry = registry();
    let alice = TestPlayer::new("alice");
    let mut dave = TestPlayer::new("dave");

    let id = registry
        .create_session("alice", alice.handle(), tea_ten(5))
        .await
        .unwrap();
    registry.issue_start_signal(id).await.unwrap();
    registry.join_game(id, "dave", dave.handle(), 1).await.unwrap();

    assert_eq!(dave.next_event().await.kind(), "player_joined");
    match dave.next_event().await {
        GameEvent::OpponentTurn { view } => assert_eq!(view.guesses_left, 5),
        other => panic!("expected opponent_turn, got {:?}", other),
    }
}

#[tokio::test]
async fn test_start_game_generates_puzzle() {
    let registry = registry_with(test_config(), InMemoryAccountService::new());
    let mut alice = TestPlayer::new("alice");

    let id = registry
        .start_game("alice", alice.handle(), 2, 2, 1)
        .await
        .unwrap();

    let snapshot = registry.snapshot(id).await.unwrap();
    assert_eq!(snapshot.owner, "alice");
    assert_eq!(snapshot.state, SessionState::WaitingForPlayers);
    assert_eq!(snapshot.grid.count('-'), 5);
    // Difficulty 2 over five letter cells
    assert_eq!(registry.guess_counter(id).await.unwrap(), 10);

    registry.issue_start_signal(id).await.unwrap();
    assert_eq!(alice.next_event().await, GameEvent::GameStarted);
}

#[tokio::test]
async fn test_start_game_rejects_bad_arguments() {
    let registry = registry();
    let alice = TestPlayer::new("alice");

    assert!(matches!(
        registry.start_game("alice", alice.handle(), 0, 2, 1).await,
        Err(SessionError::InvalidRequest(_))
    ));
    assert!(matches!(
        registry.start_game("alice", alice.handle(), 2, 0, 2).await,
        Err(SessionError::InvalidRequest(_))
    ));
    assert!(matches!(
        registry.start_game("alice", alice.handle(), 2, 99, 3).await,
        Err(SessionError::InvalidRequest(_))
    ));
    // Two words cannot make a five-word puzzle
    assert!(matches!(
        registry.start_game("alice", alice.handle(), 5, 2, 4).await,
        Err(SessionError::Layout(_))
    ));
    assert_eq!(registry.session_count().await, 0);
}

#[tokio::test]
async fn test_unknown_session() {
    let registry = registry();
    let alice = TestPlayer::new("alice");

    assert_eq!(
        registry.join_game(42, "alice", alice.handle(), 1).await,
        Err(SessionError::SessionNotFound(42))
    );
    assert_eq!(
        registry.issue_start_signal(42).await,
        Err(SessionError::SessionNotFound(42))
    );
    assert_eq!(
        registry.guess_counter(42).await,
        Err(SessionError::SessionNotFound(42))
    );
}

#[tokio::test]
async fn test_word_operations_delegate() {
    let registry = registry();

    assert!(registry.check_word("tea").await.unwrap());
    assert!(registry.add_word("Cat").await.unwrap());
    assert!(!registry.add_word("cat").await.unwrap());
    assert!(registry.check_word("cat").await.unwrap());
    assert!(registry.remove_word("cat").await.unwrap());
    assert!(!registry.check_word("cat").await.unwrap());
}

#[tokio::test]
async fn test_words_with_non_letters_are_refused() {
    let registry = registry();

    for word in ["x-ray", "a b", "e.g"] {
        let result = registry.add_word(word).await;
        assert!(
            matches!(result, Err(SessionError::InvalidRequest(_))),
            "{word}: {result:?}"
        );
        assert!(!registry.check_word(word).await.unwrap());
    }
}
