//! Rate limiting for WebSocket client messages.
//!
//! Each connection carries a [`ConnectionLimiter`]: a short burst window and a
//! longer sustained window, both sliding.

use std::{
    collections::VecDeque,
    fmt,
    time::{Duration, Instant},
};

/// Sliding-window counter
#[derive(Debug)]
pub struct SlidingWindow {
    /// Timestamps of accepted messages still inside the window
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindow {
    /// Create a window allowing `max_requests` per `window`
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Room for one more message at `now`
    ///
    /// Expired timestamps are dropped first; nothing is recorded.
    pub fn has_room(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.len() < self.max_requests
    }

    fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
    }

    /// Messages counted in the current window
    pub fn current_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Time until the oldest message leaves the window
    pub fn reset_in(&self, now: Instant) -> Option<Duration> {
        self.timestamps
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
    }
}

/// Which limit a message tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    Burst,
    Sustained,
}

impl LimitExceeded {
    /// Label for metrics
    pub fn label(self) -> &'static str {
        match self {
            LimitExceeded::Burst => "burst",
            LimitExceeded::Sustained => "sustained",
        }
    }
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitExceeded::Burst => write!(f, "Rate limit exceeded. Please slow down."),
            LimitExceeded::Sustained => {
                write!(f, "Too many messages. Please wait before sending more.")
            }
        }
    }
}

/// Per-connection limiter: 10 messages per second and 100 per minute
#[derive(Debug)]
pub struct ConnectionLimiter {
    burst: SlidingWindow,
    sustained: SlidingWindow,
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::new(
            SlidingWindow::new(10, Duration::from_secs(1)),
            SlidingWindow::new(100, Duration::from_secs(60)),
        )
    }
}

impl ConnectionLimiter {
    pub fn new(burst: SlidingWindow, sustained: SlidingWindow) -> Self {
        Self { burst, sustained }
    }

    /// Admit one message now
    pub fn check(&mut self) -> Result<(), LimitExceeded> {
        self.check_at(Instant::now())
    }

    /// Admit one message at `now`
    ///
    /// A message refused by either window counts against neither.
    pub fn check_at(&mut self, now: Instant) -> Result<(), LimitExceeded> {
        if !self.burst.has_room(now) {
            return Err(LimitExceeded::Burst);
        }
        if !self.sustained.has_room(now) {
            return Err(LimitExceeded::Sustained);
        }
        self.burst.record(now);
        self.sustained.record(now);
        Ok(())
    }
}
