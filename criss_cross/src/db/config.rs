//! Pool settings for the account score database.

use std::{env, str::FromStr, time::Duration};

/// How the score pool connects and recycles connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Wait for a free connection before giving up
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Connections older than this are recycled even when busy
    pub max_lifetime: Duration,
}

fn read<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}

fn read_secs(key: &str) -> Option<Duration> {
    read::<u64>(key).map(Duration::from_secs)
}

impl DatabaseConfig {
    /// Settings from `DATABASE_URL` plus the `DB_*` overrides
    ///
    /// `None` when `DATABASE_URL` is unset, in which case scores stay in memory.
    pub fn from_env() -> Option<Self> {
        env::var("DATABASE_URL").ok().map(Self::with_url)
    }

    /// Local defaults with `url`, then `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`,
    /// `DB_CONNECTION_TIMEOUT`, `DB_IDLE_TIMEOUT` and `DB_MAX_LIFETIME` applied
    /// on top. Durations are whole seconds; unparsable values are ignored.
    pub fn with_url(url: impl Into<String>) -> Self {
        let base = Self::local();
        Self {
            database_url: url.into(),
            max_connections: read("DB_MAX_CONNECTIONS").unwrap_or(base.max_connections),
            min_connections: read("DB_MIN_CONNECTIONS").unwrap_or(base.min_connections),
            acquire_timeout: read_secs("DB_CONNECTION_TIMEOUT").unwrap_or(base.acquire_timeout),
            idle_timeout: read_secs("DB_IDLE_TIMEOUT").unwrap_or(base.idle_timeout),
            max_lifetime: read_secs("DB_MAX_LIFETIME").unwrap_or(base.max_lifetime),
        }
    }

    /// A small pool against a local `criss_cross` database
    pub fn local() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/criss_cross".to_owned(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(10 * 60),
            max_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_pool_bounds() {
        let config = DatabaseConfig::default();
        assert!(config.database_url.starts_with("postgres://"));
        assert!(config.min_connections <= config.max_connections);
        assert!(config.idle_timeout < config.max_lifetime);
    }

    #[test]
    fn test_with_url_keeps_url() {
        let config = DatabaseConfig::with_url("postgres://scores.internal/cc");
        assert_eq!(config.database_url, "postgres://scores.internal/cc");
    }
}
