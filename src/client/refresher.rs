//! Exchanges the cached token for a new one.

use std::sync::Arc;
use tracing::{info, warn};

use super::api::{RefreshReply, SessionApi, TransportError};
use super::cache::TokenCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// Nothing in the cache to exchange.
    NoToken,
    /// The endpoint declined the exchange.
    Rejected { status: u16 },
    /// The endpoint could not be reached or answered nonsense.
    Transport(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { token: String, expires_at: i64 },
    Failed(RefreshFailure),
}

pub struct SessionRefresher<A> {
    cache: Arc<TokenCache>,
    api: Arc<A>,
}

impl<A: SessionApi> SessionRefresher<A> {
    pub fn new(cache: Arc<TokenCache>, api: Arc<A>) -> Self {
        Self { cache, api }
    }

    /// Exchange the cached token. On success the new token is committed to
    /// the cache; on failure the cache is left as it was.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(cached) = self.cache.get() else {
            return RefreshOutcome::Failed(RefreshFailure::NoToken);
        };

        match self.api.refresh(&cached.token).await {
            Ok(RefreshReply::Issued { token, expires_at }) => {
                self.cache.set(token.clone(), expires_at);
                info!(expires_at, "Session token refreshed");
                RefreshOutcome::Refreshed { token, expires_at }
            }
            Ok(RefreshReply::Rejected { status }) => {
                info!(status, "Refresh declined");
                RefreshOutcome::Failed(RefreshFailure::Rejected { status })
            }
            Err(e) => {
                warn!(error = %e, "Refresh request failed");
                RefreshOutcome::Failed(RefreshFailure::Transport(e))
            }
        }
    }
}
