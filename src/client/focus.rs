//! Re-validation when the host application returns to the foreground.
//!
//! A token can expire while the application is backgrounded. This task runs
//! the composite policy on every return to the foreground so that expiry is
//! caught then, not at the next protected mount.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::api::SessionApi;
use super::coordinator::SessionCoordinator;

/// Focus changes reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Foreground,
    Background,
}

/// Handle to the background task. Dropping it stops the task.
pub struct FocusRevalidator {
    handle: JoinHandle<()>,
}

impl FocusRevalidator {
    /// Spawn the task. It ends when `focus` is closed or the handle is dropped.
    pub fn spawn<A>(coordinator: Arc<SessionCoordinator<A>>, mut focus: mpsc::Receiver<Focus>) -> Self
    where
        A: SessionApi + 'static,
    {
        let handle = tokio::spawn(async move {
            while let Some(event) = focus.recv().await {
                if event != Focus::Foreground {
                    continue;
                }
                if !coordinator.has_session() {
                    debug!("Foregrounded without a session, skipping check");
                    continue;
                }
                let status = coordinator.ensure_session().await;
                debug!(active = status.is_active(), "Foreground session check finished");
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for FocusRevalidator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
