//! Structured logging configuration.
//!
//! The library logs through the `log` facade; those records are bridged into the
//! same `tracing` subscriber so session, request and connection logs share one
//! output.

use std::time::Duration;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn,hyper=warn,tower_http=warn";

/// Session requests slower than this are logged as warnings
pub const SLOW_REQUEST: Duration = Duration::from_secs(1);

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
///
/// ```no_run
/// cc_server::logging::init().unwrap();
/// tracing::info!("ready");
/// ```
pub fn init() -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true).with_line_number(true))
        .try_init()
}

/// A WebSocket message refused before it reached the registry
pub fn log_rejected_request(username: &str, operation: &str, reason: &str) {
    tracing::warn!(username, operation, reason, "Request refused");
}

/// A session request that reached the registry
pub fn log_session_request(username: &str, operation: &str, elapsed: Duration, ok: bool) {
    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed > SLOW_REQUEST {
        tracing::warn!(username, operation, elapsed_ms, ok, "Slow session request");
    } else {
        tracing::debug!(username, operation, elapsed_ms, ok, "Session request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init();
        assert!(init().is_err());
    }

    #[test]
    fn test_request_logging() {
        log_rejected_request("alice", "guess", "rate limited");
        log_session_request("alice", "guess", Duration::from_millis(12), true);
        log_session_request("bob", "start_game", Duration::from_millis(2500), false);
    }
}
