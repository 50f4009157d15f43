//! Criss-cross puzzle server.
//!
//! Serves the game over a WebSocket (requests plus pushed events) and a small
//! REST surface for session views and the word dictionary.
//!
//! - [`api`]: Router, handlers and the WebSocket transport
//! - [`config`]: Environment-driven server configuration
//! - [`logging`]: `tracing` subscriber setup and request log helpers
//! - [`metrics`]: Prometheus exporter and metric recorders

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
