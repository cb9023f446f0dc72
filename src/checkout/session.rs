//! The single polling session a checkout may have running.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// A running poll loop for one transaction, tagged with a unique id.
/// Dropping it aborts the loop.
pub struct PollingSession {
    id: u64,
    transaction_id: String,
    handle: Option<JoinHandle<()>>,
}

impl PollingSession {
    /// Releases the task without aborting it. Used by the loop when it ends itself.
    fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Holds at most one active [`PollingSession`]. Loops check
/// [`SessionSlot::is_current`] on every tick so a replaced or cancelled
/// session never acts.
#[derive(Default)]
pub struct SessionSlot {
    active: Mutex<Option<PollingSession>>,
    next_id: AtomicU64,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PollingSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels any active session, then spawns `run(session_id)` as the new one.
    pub fn start<F, Fut>(&self, transaction_id: String, run: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut active = self.lock();

        if let Some(previous) = active.take() {
            tracing::debug!(
                session_id = previous.id,
                transaction_id = %previous.transaction_id,
                "Replacing active polling session"
            );
        }

        let handle = tokio::spawn(run(id));
        *active = Some(PollingSession {
            id,
            transaction_id,
            handle: Some(handle),
        });

        id
    }

    /// Stops the active session. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_current(&self, session_id: u64) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|session| session.id == session_id)
    }

    pub fn active_transaction(&self) -> Option<String> {
        self.lock()
            .as_ref()
            .map(|session| session.transaction_id.clone())
    }

    /// Ends `session_id` from inside its own loop. Returns `false` if the
    /// session is no longer the active one, in which case the caller must
    /// not act on its result.
    pub fn finish(&self, session_id: u64) -> bool {
        let mut active = self.lock();
        match active.as_ref() {
            Some(session) if session.id == session_id => {
                if let Some(session) = active.take() {
                    session.detach();
                }
                true
            }
            _ => false,
        }
    }
}
