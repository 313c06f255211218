//! Persistence gate: the one-bit "tutorial already shown" memory.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Storage key of the seen flag.
pub const TUTORIAL_SEEN_KEY: &str = "tutorial-seen";

const SEEN_VALUE: &str = "true";

/// Reads and writes the seen flag for one browser.
///
/// Storage failures never reach the caller: a failed read counts as "not
/// seen" and a failed write is dropped with a warning.
#[derive(Clone)]
pub struct PersistenceGate {
    store: Arc<dyn KeyValueStore>,
    browser_id: String,
}

impl PersistenceGate {
    pub fn new(store: Arc<dyn KeyValueStore>, browser_id: impl Into<String>) -> Self {
        Self {
            store,
            browser_id: browser_id.into(),
        }
    }

    pub fn browser_id(&self) -> &str {
        &self.browser_id
    }

    pub async fn has_seen(&self) -> bool {
        match self.store.get(&self.browser_id, TUTORIAL_SEEN_KEY).await {
            Ok(value) => value.as_deref() == Some(SEEN_VALUE),
            Err(e) => {
                warn!(
                    browser = %self.browser_id,
                    error = %e,
                    "Failed to read tutorial flag, treating as not seen"
                );
                false
            }
        }
    }

    pub async fn mark_seen(&self) {
        match self
            .store
            .set(&self.browser_id, TUTORIAL_SEEN_KEY, SEEN_VALUE)
            .await
        {
            Ok(()) => debug!(browser = %self.browser_id, "Tutorial marked as seen"),
            Err(e) => {
                warn!(browser = %self.browser_id, error = %e, "Failed to persist tutorial flag");
            }
        }
    }

    /// Forget the flag so the tutorial auto-starts again. Returns whether a
    /// flag was removed.
    pub async fn reset(&self) -> bool {
        match self.store.delete(&self.browser_id, TUTORIAL_SEEN_KEY).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(browser = %self.browser_id, error = %e, "Failed to reset tutorial flag");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn never_written_is_not_seen() {
        let gate = PersistenceGate::new(Arc::new(MemoryStore::new()), "b1");
        assert!(!gate.has_seen().await);
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let gate = PersistenceGate::new(store.clone(), "b1");
        gate.mark_seen().await;
        gate.mark_seen().await;
        assert!(gate.has_seen().await);
        assert_eq!(
            store.get("b1", TUTORIAL_SEEN_KEY).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn flag_is_per_browser() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        PersistenceGate::new(store.clone(), "b1").mark_seen().await;
        assert!(!PersistenceGate::new(store, "b2").has_seen().await);
    }

    #[tokio::test]
    async fn unavailable_storage_reads_as_not_seen() {
        let store = Arc::new(MemoryStore::new());
        let gate = PersistenceGate::new(store.clone(), "b1");
        gate.mark_seen().await;
        store.set_unavailable(true);
        assert!(!gate.has_seen().await);
        // Write failure is swallowed
        gate.mark_seen().await;
    }

    #[tokio::test]
    async fn reset_clears_flag() {
        let gate = PersistenceGate::new(Arc::new(MemoryStore::new()), "b1");
        gate.mark_seen().await;
        assert!(gate.reset().await);
        assert!(!gate.has_seen().await);
        assert!(!gate.reset().await);
    }
}
