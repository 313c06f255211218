//! `KeyValueStore` trait: durable string settings scoped per browser.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic key-value store.
///
/// `scope` identifies the browser (or any other client identity) the value
/// belongs to; the same key in two scopes holds two independent values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Write (upsert) a value.
    async fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), DatabaseError>;

    /// Remove a value. Returns whether a row was removed.
    async fn delete(&self, scope: &str, key: &str) -> Result<bool, DatabaseError>;
}
