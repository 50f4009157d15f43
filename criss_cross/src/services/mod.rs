//! External collaborators consumed by the game core.
//!
//! This module defines:
//! - `AccountService`: persistent user scores, read at join and credited at game end
//! - `WordRepository`: the word dictionary used for puzzle generation and word ops
//! - In-memory implementations of both (the PostgreSQL account store lives in `db`)
//!
//! Collaborator calls are best-effort. Callers bound them with [`bounded`] and log
//! failures instead of letting them unwind game state.

use std::{future::Future, time::Duration};
use tokio::time::timeout;

pub mod account;
pub mod errors;
pub mod words;

pub use account::{AccountService, InMemoryAccountService};
pub use errors::{ServiceError, ServiceResult};
pub use words::{InMemoryWordRepository, WordRepository};

/// Run a collaborator call with a deadline
///
/// # Arguments
///
/// * `duration` - Deadline
/// * `future` - Service call
///
/// # Returns
///
/// * `ServiceResult<T>` - Call result, or `ServiceError::Timeout`
pub async fn bounded<F, T>(duration: Duration, future: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(duration)),
    }
}
