//! Asks the authority whether the cached token is still valid.

use std::sync::Arc;
use tracing::{debug, warn};

use super::api::{SessionApi, TransportError, ValidateReply};
use super::cache::TokenCache;

/// Why the current session did not validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidCause {
    /// Nothing in the cache; no request was made.
    NoToken,
    /// The authority refused the token.
    Rejected,
    /// The authority could not be reached.
    Transport(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid { subject_id: String },
    Invalid(InvalidCause),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }
}

pub struct SessionValidator<A> {
    cache: Arc<TokenCache>,
    api: Arc<A>,
}

impl<A: SessionApi> SessionValidator<A> {
    pub fn new(cache: Arc<TokenCache>, api: Arc<A>) -> Self {
        Self { cache, api }
    }

    /// Validate the cached token. Every call goes to the authority.
    pub async fn validate_current(&self) -> ValidationOutcome {
        let Some(cached) = self.cache.get() else {
            return ValidationOutcome::Invalid(InvalidCause::NoToken);
        };

        match self.api.validate(&cached.token).await {
            Ok(ValidateReply::Valid { subject_id }) => ValidationOutcome::Valid { subject_id },
            Ok(ValidateReply::Rejected) => {
                debug!("Authority rejected cached token");
                ValidationOutcome::Invalid(InvalidCause::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "Could not reach authority to validate token");
                ValidationOutcome::Invalid(InvalidCause::Transport(e))
            }
        }
    }
}
