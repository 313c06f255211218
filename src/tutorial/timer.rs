//! Single-shot scheduled actions that fire on a ready signal or a capped
//! fallback delay, whichever comes first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a scheduled action.
///
/// The action runs at most once. `cancel()` aborts it if it has not fired.
#[derive(Debug)]
pub struct PendingTimer {
    label: &'static str,
    ready: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl PendingTimer {
    /// Spawn `action` to run once `signal_ready()` is called or `fallback`
    /// elapses.
    pub fn spawn<F, Fut>(label: &'static str, fallback: Duration, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ready = Arc::new(Notify::new());
        let waiter = Arc::clone(&ready);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = waiter.notified() => debug!(timer = label, "Ready signal received"),
                _ = tokio::time::sleep(fallback) => debug!(timer = label, "Fallback delay elapsed"),
            }
            action().await;
        });
        Self {
            label,
            ready,
            handle,
        }
    }

    /// Fire now instead of waiting for the fallback.
    pub fn signal_ready(&self) {
        // notify_one stores a permit, so a signal that arrives before the
        // task first polls is not lost.
        self.ready.notify_one();
    }

    pub fn cancel(self) {
        debug!(timer = self.label, "Timer cancelled");
        self.handle.abort();
    }
}
