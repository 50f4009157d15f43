//! Deadlines for account store queries.
//!
//! An overrunning query surfaces as `ServiceError::Timeout`; the session that
//! asked keeps the score it already holds.

use crate::services::{ServiceError, ServiceResult};
use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Deadline for one account store query
pub const SCORE_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Run `query`, failing after `deadline`
pub async fn with_timeout<F, T>(deadline: Duration, query: F) -> ServiceResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(deadline, query).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::Timeout(deadline)),
    }
}

/// Run `query` under [`SCORE_QUERY_TIMEOUT`]
pub async fn with_default_timeout<F, T>(query: F) -> ServiceResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(SCORE_QUERY_TIMEOUT, query).await
}
