//! Session and registry configuration.

use super::models::SessionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Expected gap between client heartbeats (default: 5s)
    pub heartbeat_interval: Duration,

    /// Missed intervals before a player is reaped (default: 3)
    pub timeout_multiplier: u32,

    /// How often the monitor sweeps sessions (default: heartbeat interval)
    pub sweep_interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            timeout_multiplier: 3,
            sweep_interval: Duration::from_secs(5),
        }
    }
}

impl LivenessConfig {
    /// Heartbeat age after which a player counts as gone
    ///
    /// Saturates at `Duration::MAX`; [`SessionConfig::validate`] rejects such settings.
    pub fn timeout(&self) -> Duration {
        self.heartbeat_interval
            .checked_mul(self.timeout_multiplier)
            .unwrap_or(Duration::MAX)
    }
}

/// Session registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Largest session id; ids are drawn from `1..=max_session_id` (default: 99)
    pub max_session_id: SessionId,

    /// Random probes before scanning the id space (default: 64)
    pub id_probe_attempts: u32,

    /// Deadline for allocating an id (default: 5s)
    pub allocation_window: Duration,

    /// Most words a puzzle may have (default: 10)
    pub max_words: usize,

    /// Largest difficulty factor (default: 5)
    pub max_difficulty: u32,

    /// Stems tried when generating a puzzle (default: 20)
    pub layout_attempts: usize,

    /// Session actor inbox size (default: 100)
    pub inbox_capacity: usize,

    /// Deadline for a session to answer a request (default: 5s)
    pub request_timeout: Duration,

    /// Deadline for one callback delivery (default: 5s)
    pub delivery_timeout: Duration,

    /// Queued events per player before dropping (default: 64)
    pub lane_capacity: usize,

    /// Deadline for account and word service calls (default: 3s)
    pub service_timeout: Duration,

    /// Replies remembered per player for duplicate requests (default: 16)
    pub dedup_history: usize,

    pub liveness: LivenessConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_session_id: 99,
            id_probe_attempts: 64,
            allocation_window: Duration::from_secs(5),
            max_words: 10,
            max_difficulty: 5,
            layout_attempts: 20,
            inbox_capacity: 100,
            request_timeout: Duration::from_secs(5),
            delivery_timeout: Duration::from_secs(5),
            lane_capacity: 64,
            service_timeout: Duration::from_secs(3),
            dedup_history: 16,
            liveness: LivenessConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_session_id == 0 {
            return Err("Max session id must be at least 1".to_string());
        }

        if self.max_words == 0 {
            return Err("Max words must be at least 1".to_string());
        }

        if self.max_difficulty == 0 {
            return Err("Max difficulty must be at least 1".to_string());
        }

        if self.inbox_capacity == 0 || self.lane_capacity == 0 {
            return Err("Channel capacities must be at least 1".to_string());
        }

        if self.dedup_history == 0 {
            return Err("Dedup history must keep at least 1 reply".to_string());
        }

        if self.liveness.heartbeat_interval.is_zero() || self.liveness.timeout_multiplier == 0 {
            return Err("Heartbeat interval and timeout multiplier must be positive".to_string());
        }

        if self
            .liveness
            .heartbeat_interval
            .checked_mul(self.liveness.timeout_multiplier)
            .is_none()
        {
            return Err("Heartbeat timeout overflows".to_string());
        }

        if self.liveness.sweep_interval.is_zero() {
            return Err("Sweep interval must be positive".to_string());
        }

        Ok(())
    }
}
