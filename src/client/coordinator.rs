//! Composite session policy: validate, refresh on failure, expire on both.
//!
//! Runs are single-flight. A caller that arrives while a run is in progress
//! waits for it and receives its outcome instead of starting a second run, so
//! two triggers firing together (mount and focus) cannot race two refreshes
//! against the cache.
//!
//! Each run executes on its own task. Callers only wait on a `watch` channel,
//! so dropping a caller (an unmounted view, an aborted focus task, a timeout)
//! never interrupts a refresh between the exchange and the cache commit.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use super::api::SessionApi;
use super::cache::TokenCache;
use super::refresher::{RefreshFailure, RefreshOutcome, SessionRefresher};
use super::validator::{InvalidCause, SessionValidator, ValidationOutcome};

const EVENT_CAPACITY: usize = 16;

/// Result of one composite-policy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The authority accepted the cached token.
    Validated { subject_id: String },
    /// Validation failed but a new token was obtained and cached.
    Refreshed { expires_at: i64 },
    /// Both steps failed; the cache has been cleared.
    Expired {
        validation: InvalidCause,
        refresh: RefreshFailure,
    },
    /// The run's task died before reporting. The cache was left as it was.
    Interrupted,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::Validated { .. } | SessionStatus::Refreshed { .. }
        )
    }
}

/// Notifications for the hosting application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new token replaced the old one.
    Refreshed { expires_at: i64 },
    /// The session ended; the host should send the user to re-authenticate.
    Expired,
    /// The session was ended on purpose.
    LoggedOut,
}

type RunReceiver = watch::Receiver<Option<SessionStatus>>;

#[derive(Default)]
struct Flight {
    completed: u64,
    running: Option<RunReceiver>,
}

struct Inner<A> {
    cache: Arc<TokenCache>,
    validator: SessionValidator<A>,
    refresher: SessionRefresher<A>,
    flight: Mutex<Flight>,
    events: broadcast::Sender<SessionEvent>,
}

pub struct SessionCoordinator<A> {
    inner: Arc<Inner<A>>,
}

impl<A: SessionApi + 'static> SessionCoordinator<A> {
    pub fn new(cache: Arc<TokenCache>, api: Arc<A>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Inner {
            validator: SessionValidator::new(cache.clone(), api.clone()),
            refresher: SessionRefresher::new(cache.clone(), api),
            cache,
            flight: Mutex::new(Flight::default()),
            events,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.inner.cache
    }

    /// Whether a token is held, i.e. a session is believed active.
    pub fn has_session(&self) -> bool {
        self.inner.cache.get().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Number of composite-policy runs that have finished.
    pub fn runs(&self) -> u64 {
        self.inner.lock_flight().completed
    }

    /// Run the composite policy, or join the run already in flight.
    ///
    /// Cancel-safe: dropping the returned future leaves the run going.
    pub async fn ensure_session(&self) -> SessionStatus {
        let mut run = self.join_or_start();
        let outcome = run.wait_for(Option::is_some).await.map(|status| (*status).clone());

        match outcome {
            Ok(Some(status)) => status,
            _ => {
                error!("Session check ended without an outcome");
                let mut flight = self.inner.lock_flight();
                if flight
                    .running
                    .as_ref()
                    .is_some_and(|current| current.same_channel(&run))
                {
                    flight.running = None;
                }
                SessionStatus::Interrupted
            }
        }
    }

    /// Forget the session: clear the cache and notify the host.
    pub async fn logout(&self) {
        let running = self.inner.lock_flight().running.clone();
        if let Some(mut run) = running {
            // An in-flight run commits before the clear
            let _ = run.wait_for(Option::is_some).await;
        }
        self.inner.cache.clear();
        let _ = self.inner.events.send(SessionEvent::LoggedOut);
    }

    fn join_or_start(&self) -> RunReceiver {
        let mut flight = self.inner.lock_flight();
        if let Some(run) = &flight.running {
            debug!("Joined in-flight session check");
            return run.clone();
        }

        let (tx, rx) = watch::channel(None);
        flight.running = Some(rx.clone());

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let status = inner.run_policy().await;
            {
                let mut flight = inner.lock_flight();
                flight.completed += 1;
                flight.running = None;
            }
            let _ = tx.send(Some(status));
        });

        rx
    }
}

impl<A: SessionApi> Inner<A> {
    fn lock_flight(&self) -> MutexGuard<'_, Flight> {
        // Never held across an await; a poisoned guard still holds consistent counters
        self.flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_policy(&self) -> SessionStatus {
        let validation = match self.validator.validate_current().await {
            ValidationOutcome::Valid { subject_id } => {
                return SessionStatus::Validated { subject_id };
            }
            ValidationOutcome::Invalid(cause) => cause,
        };

        debug!(cause = ?validation, "Validation failed, attempting refresh");

        match self.refresher.refresh().await {
            RefreshOutcome::Refreshed { expires_at, .. } => {
                let _ = self.events.send(SessionEvent::Refreshed { expires_at });
                SessionStatus::Refreshed { expires_at }
            }
            RefreshOutcome::Failed(refresh) => {
                info!(validation = ?validation, refresh = ?refresh, "Session expired");
                self.cache.clear();
                let _ = self.events.send(SessionEvent::Expired);
                SessionStatus::Expired {
                    validation,
                    refresh,
                }
            }
        }
    }
}
