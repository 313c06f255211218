//! In-memory `KeyValueStore` for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::store::traits::KeyValueStore;

/// Map-backed store. Can be switched into a failing mode to simulate
/// unavailable storage.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<(String, String), String>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Pool("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, DatabaseError> {
        self.check()?;
        let values = self.values.read().await;
        Ok(values.get(&(scope.to_string(), key.to_string())).cloned())
    }

    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.check()?;
        let mut values = self.values.write().await;
        values.insert((scope.to_string(), key.to_string()), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, scope: &str, key: &str) -> Result<bool, DatabaseError> {
        self.check()?;
        let mut values = self.values.write().await;
        Ok(values
            .remove(&(scope.to_string(), key.to_string()))
            .is_some())
    }
}
