//! Per-recipient notification fan-out.

use super::{
    callback::{CallbackHandle, deliver},
    events::GameEvent,
};
use crate::session::SessionId;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::mpsc, time::timeout};

/// Event addressed to one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub event: GameEvent,
}

impl Notification {
    pub fn new(recipient: impl Into<String>, event: GameEvent) -> Self {
        Self {
            recipient: recipient.into(),
            event,
        }
    }
}

/// Outcome of handing a batch to the lanes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events queued for delivery
    pub queued: usize,

    /// Events dropped (full lane or unknown recipient)
    pub dropped: usize,
}

struct DeliveryLane {
    sender: mpsc::Sender<GameEvent>,
    callback: CallbackHandle,
}

/// Fan-out over per-player delivery lanes
///
/// Each registered player gets a bounded queue drained by its own task, so events
/// reach one player in order while a slow or broken player never holds up the
/// others. Enqueueing never waits.
pub struct NotificationDispatcher {
    session_id: SessionId,
    delivery_timeout: Duration,
    lane_capacity: usize,
    lanes: HashMap<String, DeliveryLane>,
}

impl NotificationDispatcher {
    /// Create a dispatcher for one session
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session the lanes belong to (for logs)
    /// * `delivery_timeout` - Deadline for one callback invocation
    /// * `lane_capacity` - Queued events per player before dropping
    pub fn new(session_id: SessionId, delivery_timeout: Duration, lane_capacity: usize) -> Self {
        Self {
            session_id,
            delivery_timeout,
            lane_capacity: lane_capacity.max(1),
            lanes: HashMap::new(),
        }
    }

    /// Open a delivery lane for a player
    pub fn register(&mut self, username: &str, callback: CallbackHandle) {
        let (sender, receiver) = mpsc::channel(self.lane_capacity);

        tokio::spawn(run_lane(
            self.session_id,
            username.to_string(),
            callback.clone(),
            receiver,
            self.delivery_timeout,
        ));

        self.lanes
            .insert(username.to_string(), DeliveryLane { sender, callback });
    }

    /// Close a player's lane once it drains
    pub fn unregister(&mut self, username: &str) -> bool {
        self.lanes.remove(username).is_some()
    }

    /// Number of open lanes
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queue a batch of notifications
    ///
    /// Failures stay per recipient: they are logged and flag that player's
    /// callback as suspect.
    pub fn dispatch(&self, notifications: Vec<Notification>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for Notification { recipient, event } in notifications {
            let Some(lane) = self.lanes.get(&recipient) else {
                log::warn!(
                    "Session {}: no delivery lane for {}, dropping {}",
                    self.session_id,
                    recipient,
                    event.kind()
                );
                report.dropped += 1;
                continue;
            };

            match lane.sender.try_send(event) {
                Ok(()) => report.queued += 1,
                Err(mpsc::error::TrySendError::Full(event)) => {
                    log::warn!(
                        "Session {}: lane for {} is full, dropping {}",
                        self.session_id,
                        recipient,
                        event.kind()
                    );
                    lane.callback.mark_suspect();
                    report.dropped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(event)) => {
                    log::debug!(
                        "Session {}: lane for {} closed, dropping {}",
                        self.session_id,
                        recipient,
                        event.kind()
                    );
                    report.dropped += 1;
                }
            }
        }

        report
    }
}

async fn run_lane(
    session_id: SessionId,
    username: String,
    callback: CallbackHandle,
    mut receiver: mpsc::Receiver<GameEvent>,
    delivery_timeout: Duration,
) {
    while let Some(event) = receiver.recv().await {
        let Some(target) = callback.upgrade() else {
            log::warn!(
                "Session {}: callback for {} is gone, discarding {}",
                session_id,
                username,
                event.kind()
            );
            callback.mark_suspect();
            continue;
        };

        match timeout(delivery_timeout, deliver(target.as_ref(), &event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!(
                    "Session {}: failed to deliver {} to {}: {}",
                    session_id,
                    event.kind(),
                    username,
                    e
                );
                callback.mark_suspect();
            }
            Err(_) => {
                log::warn!(
                    "Session {}: delivering {} to {} timed out after {:?}",
                    session_id,
                    event.kind(),
                    username,
                    delivery_timeout
                );
                callback.mark_suspect();
            }
        }
    }

    log::debug!("Session {}: delivery lane for {} closed", session_id, username);
}
