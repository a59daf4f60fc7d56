//! Per-key in-flight action tracking for optimistic toggles.
//!
//! The pending set is published through a `watch` channel so a render layer
//! can disable the matching controls. A key being run while it is already
//! pending is rejected rather than started a second time.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::list::{ErrorFn, StartFn};

/// How a [`PendingActions::run_action`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran and succeeded.
    Completed,
    /// The action ran and failed; the error went to `on_error`.
    Failed,
    /// The key was already in flight; the action was not run.
    AlreadyPending,
}

impl ActionOutcome {
    pub fn is_completed(self) -> bool {
        self == ActionOutcome::Completed
    }
}

/// Set of action keys (`"<verb>:<entityId>"`) currently in flight.
pub struct PendingActions {
    pending_tx: watch::Sender<HashSet<String>>,
    on_error: Option<Arc<ErrorFn>>,
    on_start: Option<Arc<StartFn>>,
}

impl Default for PendingActions {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingActions {
    pub fn new() -> Self {
        Self::with_callbacks(None, None)
    }

    pub fn with_callbacks(on_error: Option<Arc<ErrorFn>>, on_start: Option<Arc<StartFn>>) -> Self {
        let (pending_tx, _) = watch::channel(HashSet::new());
        Self {
            pending_tx,
            on_error,
            on_start,
        }
    }

    /// Run `action` under `key`.
    ///
    /// The key is pending from the start of the call until the action
    /// settles (or the returned future is dropped). Failures are forwarded
    /// to `on_error` and never propagate out of this call.
    pub async fn run_action<F>(&self, key: impl Into<String>, action: F) -> ActionOutcome
    where
        F: Future<Output = Result<()>>,
    {
        let key = key.into();
        if !self.pending_tx.send_if_modified(|set| set.insert(key.clone())) {
            debug!(key = %key, "action already pending, ignoring");
            return ActionOutcome::AlreadyPending;
        }
        let _guard = PendingGuard {
            pending_tx: &self.pending_tx,
            key: &key,
        };

        if let Some(on_start) = &self.on_start {
            on_start();
        }

        match action.await {
            Ok(()) => {
                debug!(key = %key, "action completed");
                ActionOutcome::Completed
            }
            Err(e) => {
                warn!(key = %key, error = %e, "action failed");
                if let Some(on_error) = &self.on_error {
                    on_error(&e);
                }
                ActionOutcome::Failed
            }
        }
    }

    /// Pure lookup.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending_tx.borrow().contains(key)
    }

    /// Clone of the current pending set.
    pub fn pending(&self) -> HashSet<String> {
        self.pending_tx.borrow().clone()
    }

    /// Number of keys with an action in flight.
    pub fn len(&self) -> usize {
        self.pending_tx.borrow().len()
    }

    /// True when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.pending_tx.borrow().is_empty()
    }

    /// Subscribe to pending-set changes.
    pub fn subscribe(&self) -> watch::Receiver<HashSet<String>> {
        self.pending_tx.subscribe()
    }
}

/// Removes the key when the action settles or is dropped mid-flight.
struct PendingGuard<'a> {
    pending_tx: &'a watch::Sender<HashSet<String>>,
    key: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending_tx.send_if_modified(|set| set.remove(self.key));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;
    use crate::error::{ApiError, ChirpError};

    #[tokio::test]
    async fn test_pending_strictly_between_start_and_settle() {
        let tracker = PendingActions::new();
        let (tx, rx) = oneshot::channel::<()>();
        assert!(!tracker.is_pending("like:p1"));

        let (outcome, ()) = tokio::join!(
            tracker.run_action("like:p1", async move {
                let _ = rx.await;
                Ok(())
            }),
            async {
                assert!(tracker.is_pending("like:p1"));
                assert!(!tracker.is_pending("like:p2"));
                let _ = tx.send(());
            }
        );

        assert_eq!(outcome, ActionOutcome::Completed);
        assert!(!tracker.is_pending("like:p1"));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_failure_reported_and_swallowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let started = Arc::clone(&starts);
        let tracker = PendingActions::with_callbacks(
            Some(Arc::new(move |e: &ChirpError| {
                assert_eq!(e.user_message(), "Post not found");
                seen.fetch_add(1, Ordering::SeqCst);
            })),
            Some(Arc::new(move || {
                started.fetch_add(1, Ordering::SeqCst);
            })),
        );

        let outcome = tracker
            .run_action("bookmark:p9", async {
                Err::<(), ChirpError>(
                    ApiError::new(404, serde_json::json!({ "message": "Post not found" })).into(),
                )
            })
            .await;

        assert_eq!(outcome, ActionOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(!tracker.is_pending("bookmark:p9"));
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected_while_pending() {
        let tracker = PendingActions::new();
        let runs = AtomicUsize::new(0);
        let (tx, rx) = oneshot::channel::<()>();

        let (first, second, ()) = tokio::join!(
            tracker.run_action("like:p1", async {
                runs.fetch_add(1, Ordering::SeqCst);
                let _ = rx.await;
                Ok(())
            }),
            tracker.run_action("like:p1", async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            async {
                let _ = tx.send(());
            }
        );

        assert_eq!(first, ActionOutcome::Completed);
        assert_eq!(second, ActionOutcome::AlreadyPending);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_run_concurrently() {
        let tracker = PendingActions::new();
        let (tx, rx) = oneshot::channel::<()>();

        let (a, b) = tokio::join!(
            tracker.run_action("like:p1", async {
                let _ = rx.await;
                Ok(())
            }),
            async {
                assert_eq!(tracker.len(), 1);
                let outcome = tracker.run_action("repost:p1", async { Ok(()) }).await;
                let _ = tx.send(());
                outcome
            }
        );

        assert!(a.is_completed());
        assert!(b.is_completed());
    }

    #[tokio::test]
    async fn test_dropped_action_releases_key() {
        let tracker = PendingActions::new();
        {
            let fut = tracker.run_action("follow:u1", std::future::pending());
            tokio::pin!(fut);
            assert!(futures_util::poll!(fut.as_mut()).is_pending());
            assert!(tracker.is_pending("follow:u1"));
        }
        assert!(!tracker.is_pending("follow:u1"));
    }
}
