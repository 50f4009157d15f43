//! Persistent account scores.

use super::errors::ServiceResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Trait for the account score collaborator
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Current persistent score, 0 for unknown users
    async fn user_score(&self, username: &str) -> ServiceResult<i64>;

    /// Add `delta` to a user's score and return the new total
    async fn update_user_score(&self, username: &str, delta: i64) -> ServiceResult<i64>;
}

/// Account scores kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryAccountService {
    scores: RwLock<HashMap<String, i64>>,
}

impl InMemoryAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed scores, mostly useful in tests
    pub fn with_scores<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            scores: RwLock::new(scores.into_iter().map(|(u, s)| (u.into(), s)).collect()),
        }
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn user_score(&self, username: &str) -> ServiceResult<i64> {
        let scores = self.scores.read().await;
        Ok(scores.get(username).copied().unwrap_or(0))
    }

    async fn update_user_score(&self, username: &str, delta: i64) -> ServiceResult<i64> {
        let mut scores = self.scores.write().await;
        let score = scores.entry(username.to_string()).or_insert(0);
        *score += delta;
        Ok(*score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_scores_zero() {
        let accounts = InMemoryAccountService::new();
        assert_eq!(accounts.user_score("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_accumulates() {
        let accounts = InMemoryAccountService::with_scores([("alice", 3)]);
        assert_eq!(accounts.update_user_score("alice", 2).await.unwrap(), 5);
        assert_eq!(accounts.update_user_score("bob", 1).await.unwrap(), 1);
        assert_eq!(accounts.user_score("alice").await.unwrap(), 5);
    }
}
