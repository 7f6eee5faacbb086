//! Gate for protected content.
//!
//! The guard is a small state machine over `Phase`. It performs no side
//! effects of its own: expiry handling (cache clear, host notification) is done
//! by the coordinator, which the host observes through `SessionEvent`. Those
//! events are fed back with `on_event` so a session that ends while content is
//! shown closes the gate.

use super::api::SessionApi;
use super::coordinator::{SessionCoordinator, SessionEvent, SessionStatus};

pub const EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again to continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unknown,
    Validating,
    Valid,
    Invalid,
}

/// The one action offered when the gate is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    Reauthenticate,
}

impl GuardAction {
    pub fn label(&self) -> &'static str {
        match self {
            GuardAction::Reauthenticate => "Sign in again",
        }
    }
}

/// What the host should render for the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Neutral waiting indicator; gated content stays hidden.
    Waiting,
    /// Render the gated content.
    Content,
    /// Blocking notice with a single call to action.
    Blocked {
        notice: &'static str,
        action: GuardAction,
    },
}

#[derive(Debug)]
pub struct SessionGuard {
    gated: bool,
    phase: Phase,
    history: Vec<Phase>,
}

impl SessionGuard {
    /// A guard for a view that requires a session. Starts `Unknown`.
    pub fn gated() -> Self {
        Self::new(true)
    }

    /// A guard for public content. Starts, and stays, `Valid`.
    pub fn ungated() -> Self {
        Self::new(false)
    }

    pub fn new(gated: bool) -> Self {
        let phase = if gated { Phase::Unknown } else { Phase::Valid };
        Self {
            gated,
            phase,
            history: vec![phase],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered since construction, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// `Unknown -> Validating`. Returns false if the guard was not `Unknown`.
    pub fn begin(&mut self) -> bool {
        if self.phase != Phase::Unknown {
            return false;
        }
        self.enter(Phase::Validating);
        true
    }

    /// `Validating -> Valid | Invalid` from a composite-policy outcome.
    /// Outcomes that arrive in any other phase are ignored.
    pub fn resolve(&mut self, status: &SessionStatus) -> Phase {
        if self.phase == Phase::Validating {
            let next = if status.is_active() {
                Phase::Valid
            } else {
                Phase::Invalid
            };
            self.enter(next);
        }
        self.phase
    }

    /// `Valid -> Invalid` when the coordinator reports the session ended
    /// outside a mount, e.g. on a focus-triggered check.
    pub fn on_event(&mut self, event: &SessionEvent) -> Phase {
        let ended = matches!(event, SessionEvent::Expired | SessionEvent::LoggedOut);
        if ended && self.gated && self.phase == Phase::Valid {
            self.enter(Phase::Invalid);
        }
        self.phase
    }

    /// Return a gated guard to `Unknown` so the next mount validates again.
    pub fn reset(&mut self) {
        if self.gated && self.phase != Phase::Unknown {
            self.enter(Phase::Unknown);
        }
    }

    pub fn view(&self) -> GuardView {
        match self.phase {
            Phase::Unknown | Phase::Validating => GuardView::Waiting,
            Phase::Valid => GuardView::Content,
            Phase::Invalid => GuardView::Blocked {
                notice: EXPIRED_NOTICE,
                action: GuardAction::Reauthenticate,
            },
        }
    }

    /// Drive the guard through one mount: `Unknown -> Validating -> Valid | Invalid`.
    ///
    /// Ungated guards and guards already past `Unknown` return immediately
    /// without contacting the coordinator. `Invalid` does not retry on its own.
    pub async fn mount<A: SessionApi + 'static>(
        &mut self,
        coordinator: &SessionCoordinator<A>,
    ) -> Phase {
        if !self.begin() {
            return self.phase;
        }
        let status = coordinator.ensure_session().await;
        self.resolve(&status)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Session guard transition");
        self.phase = phase;
        self.history.push(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::refresher::RefreshFailure;
    use crate::client::validator::InvalidCause;

    fn expired() -> SessionStatus {
        SessionStatus::Expired {
            validation: InvalidCause::Rejected,
            refresh: RefreshFailure::Rejected { status: 401 },
        }
    }

    #[test]
    fn test_initial_phase() {
        assert_eq!(SessionGuard::gated().phase(), Phase::Unknown);
        assert_eq!(SessionGuard::ungated().phase(), Phase::Valid);
        assert_eq!(SessionGuard::ungated().view(), GuardView::Content);
    }

    #[test]
    fn test_valid_path() {
        let mut guard = SessionGuard::gated();
        assert_eq!(guard.view(), GuardView::Waiting);

        assert!(guard.begin());
        assert_eq!(guard.view(), GuardView::Waiting);

        let phase = guard.resolve(&SessionStatus::Validated {
            subject_id: "S".to_string(),
        });
        assert_eq!(phase, Phase::Valid);
        assert_eq!(guard.view(), GuardView::Content);
        assert_eq!(
            guard.history(),
            &[Phase::Unknown, Phase::Validating, Phase::Valid]
        );
    }

    #[test]
    fn test_refreshed_counts_as_valid() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        assert_eq!(
            guard.resolve(&SessionStatus::Refreshed { expires_at: 10 }),
            Phase::Valid
        );
    }

    #[test]
    fn test_invalid_path_blocks_content() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        assert_eq!(guard.resolve(&expired()), Phase::Invalid);

        match guard.view() {
            GuardView::Blocked { notice, action } => {
                assert_eq!(notice, EXPIRED_NOTICE);
                assert_eq!(action, GuardAction::Reauthenticate);
                assert_eq!(action.label(), "Sign in again");
            }
            other => panic!("expected blocked view, got {:?}", other),
        }
    }

    #[test]
    fn test_interrupted_check_blocks_content() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        assert_eq!(guard.resolve(&SessionStatus::Interrupted), Phase::Invalid);
    }

    #[test]
    fn test_invalid_is_terminal_until_reset() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        guard.resolve(&expired());

        assert!(!guard.begin());
        assert_eq!(
            guard.resolve(&SessionStatus::Validated {
                subject_id: "S".to_string()
            }),
            Phase::Invalid
        );

        guard.reset();
        assert_eq!(guard.phase(), Phase::Unknown);
        assert!(guard.begin());
    }

    #[test]
    fn test_resolve_outside_validating_is_ignored() {
        let mut guard = SessionGuard::gated();
        assert_eq!(guard.resolve(&expired()), Phase::Unknown);
        assert_eq!(guard.history(), &[Phase::Unknown]);
    }

    #[test]
    fn test_session_end_closes_valid_guard() {
        for event in [SessionEvent::Expired, SessionEvent::LoggedOut] {
            let mut guard = SessionGuard::gated();
            guard.begin();
            guard.resolve(&SessionStatus::Refreshed { expires_at: 10 });

            assert_eq!(guard.on_event(&event), Phase::Invalid);
            assert!(matches!(guard.view(), GuardView::Blocked { .. }));
            assert_eq!(
                guard.history(),
                &[Phase::Unknown, Phase::Validating, Phase::Valid, Phase::Invalid]
            );
        }
    }

    #[test]
    fn test_refresh_event_keeps_guard_open() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        guard.resolve(&SessionStatus::Validated {
            subject_id: "S".to_string(),
        });
        assert_eq!(
            guard.on_event(&SessionEvent::Refreshed { expires_at: 10 }),
            Phase::Valid
        );
    }

    #[test]
    fn test_session_end_ignored_before_resolution_and_when_ungated() {
        let mut guard = SessionGuard::gated();
        guard.begin();
        assert_eq!(guard.on_event(&SessionEvent::Expired), Phase::Validating);

        let mut public = SessionGuard::ungated();
        assert_eq!(public.on_event(&SessionEvent::Expired), Phase::Valid);
    }

    #[test]
    fn test_ungated_never_validates() {
        let mut guard = SessionGuard::ungated();
        assert!(!guard.begin());
        guard.reset();
        assert_eq!(guard.phase(), Phase::Valid);
        assert_eq!(guard.history(), &[Phase::Valid]);
    }
}
