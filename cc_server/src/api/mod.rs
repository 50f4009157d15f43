//! HTTP/WebSocket API for the puzzle server.
//!
//! The WebSocket carries the full request and push surface; the REST routes
//! expose read-only session views and the word dictionary.
//!
//! # Modules
//!
//! - [`sessions`]: Session listing and read-only views
//! - [`words`]: Word dictionary add/check/remove
//! - [`websocket`]: Game requests and push events over one connection
//! - [`request_id`]: Request id, access log and HTTP metrics middleware
//! - [`rate_limiter`]: Per-connection message limits
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                         - Health check
//! GET    /ws?username=NAME               - WebSocket
//! GET    /api/v1/sessions                - List live sessions
//! GET    /api/v1/sessions/{id}           - Session snapshot
//! GET    /api/v1/sessions/{id}/puzzle    - Revealed grid
//! GET    /api/v1/sessions/{id}/guesses   - Guesses left
//! POST   /api/v1/words                   - Add a word
//! GET    /api/v1/words/{word}            - Check a word
//! DELETE /api/v1/words/{word}            - Remove a word
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development.

pub mod rate_limiter;
pub mod request_id;
pub mod sessions;
pub mod websocket;
pub mod words;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use criss_cross::{SessionRegistry, db::Database};
use serde_json::json;
use std::sync::{Arc, atomic::AtomicU64};
use tower_http::cors::CorsLayer;

pub use sessions::ApiError;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions and the request surface
    pub registry: Arc<SessionRegistry>,
    /// Present when account scores are persisted
    pub database: Option<Database>,
    /// Open WebSocket connections
    pub connections: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            database: None,
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Report database health on `/health`
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use cc_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route("/sessions/{session_id}/puzzle", get(sessions::get_puzzle))
        .route("/sessions/{session_id}/guesses", get(sessions::get_guess_counter))
        .route("/words", post(words::add_word))
        .route(
            "/words/{word}",
            get(words::check_word).delete(words::remove_word),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when every configured component answers, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":null,"sessions":{"active_count":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };

    let session_count = state.registry.session_count().await;
    crate::metrics::live_sessions(session_count);

    let overall_healthy = db_healthy.unwrap_or(true);
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "sessions": {
            "active_count": session_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
