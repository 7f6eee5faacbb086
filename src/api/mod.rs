mod cors;
mod error;
mod session;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::authority::TokenAuthority;
use crate::rate_limit::RateLimitConfig;

pub use cors::{ALLOW_HEADERS, ALLOW_METHODS, CorsConfig};
pub use error::{ApiError, INVALID_TOKEN, NO_TOKEN_PROVIDED, STORE_UNAVAILABLE};
pub use session::SessionState;

/// Create the API router.
pub fn create_api_router(
    authority: TokenAuthority,
    rate_limit: Arc<RateLimitConfig>,
    cors: CorsConfig,
) -> Router {
    let session_state = session::SessionState { authority };

    Router::new()
        .nest("/session", session::router(session_state, rate_limit))
        .layer(middleware::from_fn_with_state(
            Arc::new(cors),
            cors::add_cors_headers,
        ))
}
