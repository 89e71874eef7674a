//! In-Process Store Backend
//!
//! A `RwLock<HashMap>` behind the [`KvStore`] trait. Used by tests and by
//! single-machine deployments that don't need cross-host sharing. The
//! lock is held only for the duration of one map operation, never across
//! an await point.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe in-memory key-value store.
///
/// # Example
///
/// ```
/// use beamlink::store::{KvStore, MemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.set("PI_name", "Erik").await.unwrap();
/// assert_eq!(store.get("PI_name").await.unwrap().as_deref(), Some("Erik"));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .data
            .read()
            .expect("store lock poisoned")
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.data
            .write()
            .expect("store lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut data = self.data.write().expect("store lock poisoned");
        let current = match data.get(key) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| StoreError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("'{value}' is not an integer"),
                })?,
            None => 0,
        };
        let next = current + 1;
        data.insert(key.to_string(), next.to_string());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_unset_key() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_incr_from_missing() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("file_id").await.unwrap(), 1);
        assert_eq!(store.incr("file_id").await.unwrap(), 2);
        assert_eq!(store.get("file_id").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_incr_non_integer() {
        let store = MemoryStore::new();
        store.set("file_id", "lysozyme").await.unwrap();
        let err = store.incr("file_id").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
    }
}
