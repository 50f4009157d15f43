//! Shared helpers for session integration tests

#![allow(dead_code)]

use criss_cross::{
    CallbackHandle, ChannelCallback, GameEvent, PuzzleLayout, PuzzleState, SessionConfig,
    SessionRegistry, SessionSetup,
    services::{InMemoryAccountService, InMemoryWordRepository},
    session::Difficulty,
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::timeout};

/// A connected test player and the events pushed to them
pub struct TestPlayer {
    pub name: String,
    pub callback: Arc<ChannelCallback>,
    pub events: mpsc::Receiver<GameEvent>,
}

impl TestPlayer {
    pub fn new(name: &str) -> Self {
        let (callback, events) = ChannelCallback::new(64);
        Self {
            name: name.to_string(),
            callback,
            events,
        }
    }

    pub fn handle(&self) -> CallbackHandle {
        CallbackHandle::new(&self.callback)
    }

    /// Next pushed event, failing the test after a second of silence
    pub async fn next_event(&mut self) -> GameEvent {
        timeout(Duration::from_secs(1), self.events.recv())
            .await
            .unwrap_or_else(|_| panic!("{} received no event", self.name))
            .unwrap_or_else(|| panic!("{}'s event stream closed", self.name))
    }

    /// Drain events until one of `kind` arrives
    pub async fn wait_for(&mut self, kind: &str) -> GameEvent {
        loop {
            let event = self.next_event().await;
            if event.kind() == kind {
                return event;
            }
        }
    }

    /// Nothing else is pushed for a short while
    pub async fn assert_quiet(&mut self) {
        if let Ok(Some(event)) = timeout(Duration::from_millis(100), self.events.recv()).await {
            panic!("{} unexpectedly received {:?}", self.name, event);
        }
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        request_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

pub fn registry() -> SessionRegistry {
    registry_with(test_config(), InMemoryAccountService::new())
}

pub fn registry_with(config: SessionConfig, accounts: InMemoryAccountService) -> SessionRegistry {
    SessionRegistry::new(
        config,
        Arc::new(accounts),
        Arc::new(InMemoryWordRepository::from_words(["tea", "ten"])),
    )
}

/// Stem "tea" crossed by "ten" on the first row
pub fn tea_ten(guess_budget: u32) -> SessionSetup {
    let layout = PuzzleLayout::criss_cross("tea", &["ten".to_string()]).unwrap();
    SessionSetup::new(PuzzleState::new(layout), Difficulty::new(1, 5).unwrap())
        .with_guess_budget(guess_budget)
}

/// Wait for the session actor to remove itself
pub async fn wait_until_removed(registry: &SessionRegistry, id: u32) {
    for _ in 0..100 {
        if registry.lookup(id).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} was never removed", id);
}
