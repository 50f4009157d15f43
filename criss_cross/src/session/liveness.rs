//! Heartbeat liveness monitor.
//!
//! Players refresh their heartbeat explicitly or by any mutating call. The monitor
//! periodically asks the registry to sweep every live session; a player whose
//! heartbeat is older than the configured timeout is removed exactly as if they
//! had quit.

use super::{config::LivenessConfig, registry::SessionRegistry};
use std::sync::Weak;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

/// Background task sweeping sessions for silent players
///
/// Holds the registry weakly and stops by itself once the registry is dropped.
/// Dropping the monitor stops it as well.
pub struct LivenessMonitor {
    handle: JoinHandle<()>,
}

impl LivenessMonitor {
    /// Spawn the sweep loop
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry to sweep
    /// * `config` - Sweep interval and timeout
    pub fn spawn(registry: Weak<SessionRegistry>, config: LivenessConfig) -> Self {
        let handle = tokio::spawn(async move {
            log::info!(
                "Liveness monitor starting (sweep every {:?}, timeout {:?})",
                config.sweep_interval,
                config.timeout()
            );

            let mut ticker = interval(config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let reaped = registry.sweep().await;
                if reaped > 0 {
                    log::info!("Liveness sweep removed {} silent players", reaped);
                }
            }

            log::info!("Liveness monitor stopped");
        });

        Self { handle }
    }

    /// Stop sweeping
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
