//! Prometheus metrics.
//!
//! Recorders go through the `metrics` facade and do nothing until
//! [`init_metrics`] installs the exporter, so handlers and tests call them
//! unconditionally.
//!
//! ```rust,no_run
//! use cc_server::metrics;
//!
//! metrics::init_metrics("127.0.0.1:9090".parse().unwrap()).unwrap();
//! metrics::http_request("GET", "/health", 200, 0.4);
//! ```

use metrics::{
    Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Direction of a WebSocket frame
#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Inbound => "in",
            Direction::Outbound => "out",
        }
    }
}

/// Install the exporter, scraped at `http://<addr>/metrics`
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Prometheus exporter failed to start on {addr}: {e}"))?;
    describe();
    Ok(())
}

fn describe() {
    describe_counter!("cc_http_requests_total", "HTTP requests by method, path and status");
    describe_histogram!(
        "cc_http_request_duration_ms",
        Unit::Milliseconds,
        "HTTP request latency"
    );
    describe_gauge!("cc_ws_connections", "Open WebSocket connections");
    describe_counter!("cc_ws_connections_total", "WebSocket connections accepted");
    describe_counter!("cc_ws_frames_total", "WebSocket text frames by direction");
    describe_gauge!("cc_sessions_live", "Sessions in the registry");
    describe_counter!("cc_games_started_total", "Successful start_game requests");
    describe_counter!("cc_guesses_total", "Accepted guesses by outcome");
    describe_counter!("cc_rate_limited_total", "WebSocket messages refused by a limit");
}

/// One finished HTTP request
pub fn http_request(method: &str, path: &str, status: u16, duration_ms: f64) {
    counter!("cc_http_requests_total",
        "method" => method.to_owned(),
        "path" => path.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("cc_http_request_duration_ms",
        "method" => method.to_owned(),
        "path" => path.to_owned()
    )
    .record(duration_ms);
}

pub fn websocket_connection_opened(open: u64) {
    counter!("cc_ws_connections_total").increment(1);
    gauge!("cc_ws_connections").set(open as f64);
}

pub fn websocket_connection_closed(open: u64) {
    gauge!("cc_ws_connections").set(open as f64);
}

pub fn websocket_frame(direction: Direction) {
    counter!("cc_ws_frames_total", "direction" => direction.label()).increment(1);
}

pub fn live_sessions(count: usize) {
    gauge!("cc_sessions_live").set(count as f64);
}

pub fn game_started() {
    counter!("cc_games_started_total").increment(1);
}

pub fn guess(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("cc_guesses_total", "outcome" => outcome).increment(1);
}

/// A message refused by the named limit
pub fn rate_limited(limit: &'static str) {
    counter!("cc_rate_limited_total", "limit" => limit).increment(1);
}
