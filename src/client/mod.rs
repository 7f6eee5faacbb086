//! Client-side session handling.
//!
//! `TokenCache` holds the credential, `SessionValidator` and `SessionRefresher`
//! talk to the two endpoints, `SessionCoordinator` combines them into the
//! validate-then-refresh policy, and `SessionGuard` gates protected content on
//! its outcome. `FocusRevalidator` re-runs the policy on foreground focus.

mod api;
mod cache;
mod config;
mod coordinator;
mod focus;
mod guard;
mod http;
mod refresher;
mod validator;

use std::sync::Arc;

pub use api::{RefreshReply, SessionApi, TransportError, ValidateReply};
pub use cache::{CachedToken, TokenCache};
pub use config::{ClientConfig, ConfigError, DEFAULT_REQUEST_TIMEOUT_MS};
pub use coordinator::{SessionCoordinator, SessionEvent, SessionStatus};
pub use focus::{Focus, FocusRevalidator};
pub use guard::{EXPIRED_NOTICE, GuardAction, GuardView, Phase, SessionGuard};
pub use http::HttpSessionApi;
pub use refresher::{RefreshFailure, RefreshOutcome, SessionRefresher};
pub use validator::{InvalidCause, SessionValidator, ValidationOutcome};

/// Build a coordinator talking HTTP to the authority described by `config`.
pub fn connect(config: &ClientConfig) -> Result<SessionCoordinator<HttpSessionApi>, ConfigError> {
    let cache = match &config.cache_path {
        Some(path) => TokenCache::open(path),
        None => TokenCache::in_memory(),
    };
    let api = HttpSessionApi::from_config(config)?;
    Ok(SessionCoordinator::new(Arc::new(cache), Arc::new(api)))
}
