//! A cloneable handle for stopping generations from other tasks.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The session currently generating
#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
    pub(crate) id: Uuid,
    pub(crate) cancel: CancellationToken,
}

/// A cloneable handle for poking the controller from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone, Default)]
pub struct ChatHandle {
    pub(crate) active: Arc<Mutex<Option<ActiveSession>>>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancel the active generation, if any. Idempotent.
    pub fn stop(&self) {
        if let Some(session) = self.active.lock().as_ref() {
            tracing::debug!(session_id = %session.id, "stop requested");
            session.cancel.cancel();
        }
    }

    /// Whether a generation is in flight
    pub fn is_generating(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Id of the in-flight session
    pub fn session_id(&self) -> Option<Uuid> {
        self.active.lock().as_ref().map(|s| s.id)
    }

    /// Claim the active slot. Returns `false` if a session already holds it.
    pub(crate) fn begin(&self, id: Uuid, cancel: CancellationToken) -> bool {
        let mut active = self.active.lock();
        if active.is_some() {
            return false;
        }
        *active = Some(ActiveSession { id, cancel });
        true
    }

    /// Release the active slot.
    pub(crate) fn end(&self) {
        *self.active.lock() = None;
    }
}
