//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use criss_cross::{SessionConfig, db::DatabaseConfig, session::LivenessConfig};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration, in-memory account scores when unset
    pub database: Option<DatabaseConfig>,
    /// Newline-separated word list loaded at startup
    pub words_file: Option<PathBuf>,
    /// Session registry settings
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `words_override` - Optional word list override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        words_override: Option<PathBuf>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(default_bind()),
        };
        let metrics_bind = parse_addr("METRICS_BIND")?;

        let database = database_url_override
            .map(DatabaseConfig::with_url)
            .or_else(DatabaseConfig::from_env);

        let words_file =
            words_override.or_else(|| std::env::var("WORDS_FILE").ok().map(PathBuf::from));

        let defaults = SessionConfig::default();
        let liveness_defaults = LivenessConfig::default();
        let heartbeat_interval = Duration::from_secs(parse_env_or(
            "HEARTBEAT_INTERVAL_SECS",
            liveness_defaults.heartbeat_interval.as_secs(),
        ));

        let session = SessionConfig {
            max_session_id: parse_env_or("MAX_SESSION_ID", defaults.max_session_id),
            id_probe_attempts: parse_env_or("ID_PROBE_ATTEMPTS", defaults.id_probe_attempts),
            allocation_window: millis_env_or("ALLOCATION_WINDOW_MS", defaults.allocation_window),
            max_words: parse_env_or("MAX_WORDS", defaults.max_words),
            max_difficulty: parse_env_or("MAX_DIFFICULTY", defaults.max_difficulty),
            request_timeout: millis_env_or("REQUEST_TIMEOUT_MS", defaults.request_timeout),
            delivery_timeout: millis_env_or("DELIVERY_TIMEOUT_MS", defaults.delivery_timeout),
            service_timeout: millis_env_or("SERVICE_TIMEOUT_MS", defaults.service_timeout),
            liveness: LivenessConfig {
                heartbeat_interval,
                timeout_multiplier: parse_env_or(
                    "HEARTBEAT_TIMEOUT_MULTIPLIER",
                    liveness_defaults.timeout_multiplier,
                ),
                sweep_interval: heartbeat_interval,
            },
            ..defaults
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            words_file,
            session,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "session".to_string(),
                reason,
            })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from SERVER_BIND ({})", self.bind),
            });
        }

        if let Some(path) = &self.words_file
            && !path.is_file()
        {
            return Err(ConfigError::Invalid {
                var: "WORDS_FILE".to_string(),
                reason: format!("{} is not a readable file", path.display()),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Parse an optional address variable; a set but malformed value is an error
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("{value:?} is not an IP:PORT address ({e})"),
            }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn millis_env_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
