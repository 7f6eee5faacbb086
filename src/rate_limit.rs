//! Rate limiting for the refresh endpoint.
//!
//! Uses a token bucket per client IP.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

use crate::api::ApiError;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default refresh quota per client IP.
pub const DEFAULT_REFRESH_PER_MINUTE: u32 = 30;

/// Key used when the connection address is not available (e.g. in-process requests).
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting configuration for session endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for token refresh
    pub refresh: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create rate limiters allowing `refresh_per_minute` refreshes per IP.
    /// A value of zero is treated as one.
    pub fn new(refresh_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(refresh_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            refresh: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PER_MINUTE)
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware for rate limiting refresh requests. Preflights are never limited.
pub async fn rate_limit_refresh(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let ip = client_key(&request);
    match config.refresh.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Refresh rate limit exceeded");
            ApiError::too_many_requests("Too many refresh attempts. Please try again later.")
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_enforced_per_key() {
        let config = RateLimitConfig::new(2);
        let a = "10.0.0.1".to_string();
        let b = "10.0.0.2".to_string();

        assert!(config.refresh.check_key(&a).is_ok());
        assert!(config.refresh.check_key(&a).is_ok());
        assert!(config.refresh.check_key(&a).is_err());
        assert!(config.refresh.check_key(&b).is_ok());
    }

    #[test]
    fn test_zero_quota_allows_one() {
        let config = RateLimitConfig::new(0);
        let key = "10.0.0.1".to_string();
        assert!(config.refresh.check_key(&key).is_ok());
        assert!(config.refresh.check_key(&key).is_err());
    }
}
