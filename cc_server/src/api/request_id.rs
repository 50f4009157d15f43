//! Request id and access logging middleware.
//!
//! Every HTTP request gets an id (the client's `x-request-id` if it sent one,
//! otherwise a fresh uuid), echoed on the response and attached to the access log
//! and request metrics.

use crate::metrics;
use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Id assigned to the current request, available as an extractor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the client's id or mint a new one
    fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tag the request, log it and record its metrics
///
/// # Example
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use cc_server::api::request_id::request_id_middleware;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers());
    request.extensions_mut().insert(request_id.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    tracing::debug!(
        request_id = %request_id.as_str(),
        method = %method,
        path = %path,
        "Request started"
    );

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    metrics::http_request(method.as_str(), &path, status.as_u16(), elapsed_ms);

    tracing::info!(
        request_id = %request_id.as_str(),
        method = %method,
        path = %path,
        status = %status,
        duration_ms = elapsed_ms,
        "Request completed"
    );

    response
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request ID not found in extensions",
        ))
    }
}
