//! Server-side token authority.
//!
//! The authority is the single source of truth for token validity. A token is
//! valid iff its record is active and `now < expires_at`; nothing is cached,
//! every call re-reads the record. The first check that observes an expired
//! but still active record deactivates it, so later checks short-circuit on
//! the flag.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::db::{Database, generate_token};

/// Default lifetime of a minted token: 7 days.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Current time as Unix seconds.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Short prefix of a token, safe to log.
pub fn token_hint(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(6)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

/// Why a presented token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No credential, or an empty one.
    MissingCredential,
    /// No record, or the record was deactivated.
    UnknownOrRevoked,
    /// The record exists but `expires_at` has passed.
    Expired,
}

/// Outcome of a validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid { subject_id: String },
    Invalid(Rejection),
}

/// A freshly minted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub subject_id: String,
    pub expires_at: i64,
    /// True when the presented token was atomically retired in favor of this one.
    pub rotated: bool,
}

/// Outcome of a refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshVerdict {
    Issued(IssuedToken),
    Rejected(Rejection),
}

/// The token store could not be reached. Never conflated with a rejection.
#[derive(Debug)]
pub enum AuthorityError {
    Storage(sqlx::Error),
}

impl std::fmt::Display for AuthorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityError::Storage(e) => write!(f, "Token store unavailable: {}", e),
        }
    }
}

impl std::error::Error for AuthorityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthorityError::Storage(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for AuthorityError {
    fn from(e: sqlx::Error) -> Self {
        AuthorityError::Storage(e)
    }
}

/// Authority policy knobs.
#[derive(Debug, Clone)]
pub struct AuthoritySettings {
    /// Lifetime of tokens minted by `issue` and `refresh`.
    pub token_ttl: Duration,
    /// Retire the presented token when a refresh succeeds.
    pub rotate_on_refresh: bool,
}

impl Default for AuthoritySettings {
    fn default() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
            rotate_on_refresh: false,
        }
    }
}

#[derive(Clone)]
pub struct TokenAuthority {
    db: Database,
    settings: AuthoritySettings,
}

impl TokenAuthority {
    pub fn new(db: Database, settings: AuthoritySettings) -> Self {
        Self { db, settings }
    }

    /// Validate a presented credential against the current time.
    pub async fn validate(&self, presented: Option<&str>) -> Result<Verdict, AuthorityError> {
        self.validate_at(presented, now_unix()).await
    }

    /// Validate a presented credential as of `now` (Unix seconds).
    pub async fn validate_at(
        &self,
        presented: Option<&str>,
        now: i64,
    ) -> Result<Verdict, AuthorityError> {
        let Some(token) = presented.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Verdict::Invalid(Rejection::MissingCredential));
        };

        let Some(record) = self.db.tokens().get(token).await? else {
            debug!(token = token_hint(token), "Unknown token");
            return Ok(Verdict::Invalid(Rejection::UnknownOrRevoked));
        };

        if !record.is_active {
            debug!(token = token_hint(token), "Inactive token");
            return Ok(Verdict::Invalid(Rejection::UnknownOrRevoked));
        }

        if now >= record.expires_at {
            // The write completes before the verdict is returned
            match self.db.tokens().deactivate(token).await {
                Ok(true) => info!(
                    token = token_hint(token),
                    subject = %record.subject_id,
                    "Deactivated expired token"
                ),
                Ok(false) => {}
                Err(e) => error!(
                    token = token_hint(token),
                    error = %e,
                    "Failed to deactivate expired token"
                ),
            }
            return Ok(Verdict::Invalid(Rejection::Expired));
        }

        if let Err(e) = self.db.tokens().touch(token, now).await {
            warn!(token = token_hint(token), error = %e, "Failed to update last use");
        }

        Ok(Verdict::Valid {
            subject_id: record.subject_id,
        })
    }

    /// Exchange a presented credential for a new token.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<RefreshVerdict, AuthorityError> {
        self.refresh_at(presented, now_unix()).await
    }

    /// Exchange a presented credential for a new token as of `now`.
    ///
    /// The presented token goes through the same checks as `validate_at`, so an
    /// expired token is deactivated here too and cannot be exchanged.
    pub async fn refresh_at(
        &self,
        presented: Option<&str>,
        now: i64,
    ) -> Result<RefreshVerdict, AuthorityError> {
        let subject_id = match self.validate_at(presented, now).await? {
            Verdict::Valid { subject_id } => subject_id,
            Verdict::Invalid(rejection) => return Ok(RefreshVerdict::Rejected(rejection)),
        };
        // validate_at only accepts a non-empty credential
        let old_token = presented.map(str::trim).unwrap_or_default();

        let new_token = generate_token();
        let expires_at = self.expiry_from(now);

        if self.settings.rotate_on_refresh {
            let rotated = self
                .db
                .tokens()
                .rotate(old_token, &new_token, &subject_id, expires_at, now)
                .await?;
            if !rotated {
                // A concurrent refresh retired the token first
                return Ok(RefreshVerdict::Rejected(Rejection::UnknownOrRevoked));
            }
        } else {
            self.db
                .tokens()
                .create(&new_token, &subject_id, expires_at, now)
                .await?;
        }

        info!(
            subject = %subject_id,
            old = token_hint(old_token),
            new = token_hint(&new_token),
            rotated = self.settings.rotate_on_refresh,
            "Refreshed token"
        );

        Ok(RefreshVerdict::Issued(IssuedToken {
            token: new_token,
            subject_id,
            expires_at,
            rotated: self.settings.rotate_on_refresh,
        }))
    }

    /// Mint a first token for a subject.
    pub async fn issue(&self, subject_id: &str) -> Result<IssuedToken, AuthorityError> {
        let now = now_unix();
        let token = generate_token();
        let expires_at = self.expiry_from(now);
        self.db
            .tokens()
            .create(&token, subject_id, expires_at, now)
            .await?;

        Ok(IssuedToken {
            token,
            subject_id: subject_id.to_string(),
            expires_at,
            rotated: false,
        })
    }

    /// `now + ttl`, saturating at `i64::MAX` for lifetimes beyond the timestamp range.
    fn expiry_from(&self, now: i64) -> i64 {
        let ttl = i64::try_from(self.settings.token_ttl.as_secs()).unwrap_or(i64::MAX);
        now.saturating_add(ttl)
    }
}
