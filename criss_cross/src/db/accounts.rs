//! PostgreSQL-backed account scores.

use super::timeouts::with_default_timeout;
use crate::services::{AccountService, ServiceResult};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// Account score store over the `account_scores` table
pub struct PgAccountService {
    pool: Arc<PgPool>,
}

impl PgAccountService {
    /// Create a new PostgreSQL account service
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the `account_scores` table if it does not exist
    pub async fn ensure_schema(&self) -> ServiceResult<()> {
        with_default_timeout(
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS account_scores (
                    username TEXT PRIMARY KEY,
                    score BIGINT NOT NULL DEFAULT 0,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountService for PgAccountService {
    async fn user_score(&self, username: &str) -> ServiceResult<i64> {
        let row = with_default_timeout(
            sqlx::query("SELECT score FROM account_scores WHERE username = $1")
                .bind(username)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.map(|r| r.get::<i64, _>("score")).unwrap_or(0))
    }

    async fn update_user_score(&self, username: &str, delta: i64) -> ServiceResult<i64> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO account_scores (username, score)
                VALUES ($1, $2)
                ON CONFLICT (username)
                DO UPDATE SET score = account_scores.score + EXCLUDED.score,
                              updated_at = NOW()
                RETURNING score
                "#,
            )
            .bind(username)
            .bind(delta)
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        let score: i64 = row.get("score");
        log::debug!("Account {} credited {} (now {})", username, delta, score);
        Ok(score)
    }
}
