//! In-memory cache store implementation.
//!
//! This module provides a simple thread-safe, process-local cache store that
//! implements the generic [`CacheStore`] trait. It is primarily intended for
//! development, testing, and single-process scenarios where a shared
//! in-memory map is sufficient.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::store::{CacheStore, CacheStoreResult};
use crate::config::Timeout;

/// A simple in-memory cache backed by a `Mutex<HashMap<..>>`.
///
/// Expiration policies are honored actively: expired entries are evicted when
/// they are next observed by `get`, `contains_key`, or `approx_size`. No
/// background collector is implemented.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    map: Arc<Mutex<HashMap<String, (Value, Timeout)>>>,
}

impl Memory {
    /// Create a new, empty `Memory` cache store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for Memory {
    async fn get(&self, key: &str) -> CacheStoreResult<Option<Value>> {
        let mut map = self.map.lock().await;
        let expired = matches!(map.get(key), Some(&(_, expiry)) if expiry.is_expired(None));
        if expired {
            map.remove(key);
            return Ok(None);
        }
        Ok(map.get(key).map(|(value, _)| value.clone()))
    }

    async fn insert(&self, key: String, value: Value, expiry: Timeout) -> CacheStoreResult<()> {
        let mut map = self.map.lock().await;
        map.insert(key, (value, expiry.canonicalize()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheStoreResult<()> {
        let mut map = self.map.lock().await;
        map.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheStoreResult<()> {
        let mut map = self.map.lock().await;
        map.clear();
        Ok(())
    }

    async fn clear_matching(&self, pattern: &str) -> CacheStoreResult<usize> {
        let mut map = self.map.lock().await;
        map.retain(|_, (_, expiry)| !expiry.is_expired(None));

        if pattern.is_empty() {
            let count = map.len();
            map.clear();
            return Ok(count);
        }

        let matches: Vec<String> = map
            .keys()
            .filter(|key| key.contains(pattern))
            .cloned()
            .collect();
        for key in &matches {
            map.remove(key);
        }
        Ok(matches.len())
    }

    async fn approx_size(&self) -> CacheStoreResult<usize> {
        let mut map = self.map.lock().await;
        map.retain(|_, (_, expiry)| !expiry.is_expired(None));
        Ok(map.len())
    }

    async fn contains_key(&self, key: &str) -> CacheStoreResult<bool> {
        let mut map = self.map.lock().await;
        let expired = matches!(map.get(key), Some(&(_, expiry)) if expiry.is_expired(None));
        if expired {
            map.remove(key);
            return Ok(false);
        }
        Ok(map.contains_key(key))
    }
}
