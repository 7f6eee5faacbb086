//! Cross-origin headers for browser clients.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const MAX_AGE_SECS: &str = "86400";

/// Origin policy shared by every API response.
#[derive(Clone)]
pub struct CorsConfig {
    allow_origin: HeaderValue,
}

impl CorsConfig {
    /// Build from an origin string, falling back to `*` if it is not a valid header value.
    pub fn new(origin: &str) -> Self {
        let allow_origin = HeaderValue::from_str(origin).unwrap_or_else(|_| {
            tracing::warn!(origin = %origin, "Invalid allowed origin, using *");
            HeaderValue::from_static("*")
        });
        Self { allow_origin }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
        }
    }
}

/// Preflight handler: success with no body, whatever the credentials.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
            (header::ACCESS_CONTROL_MAX_AGE, MAX_AGE_SECS),
        ],
    )
}

/// Middleware that stamps the allowed origin on every response.
pub async fn add_cors_headers(
    State(config): State<Arc<CorsConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        config.allow_origin.clone(),
    );
    response
}
