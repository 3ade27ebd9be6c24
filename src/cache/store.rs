//! Cache store abstractions and implementations.
//!
//! This module defines a generic [`CacheStore`] trait and common types used
//! by the in-memory and Redis-backed cache implementations. The goal is a
//! simple asynchronous interface for reading, writing, and invalidating
//! cached values, optionally with expiration policies.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use serde_json::Value;
use thiserror::Error;

use crate::config::Timeout;

const CACHE_STORE_ERROR_PREFIX: &str = "cache store error: ";

/// Errors that can occur when interacting with a cache store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheStoreError {
    /// The underlying cache backend returned an error.
    #[error("{CACHE_STORE_ERROR_PREFIX}backend error: {0}")]
    Backend(String),
    /// Failed to serialize a value for storage.
    #[error("{CACHE_STORE_ERROR_PREFIX}serialization error: {0}")]
    Serialize(String),
    /// Failed to deserialize a stored value.
    #[error("{CACHE_STORE_ERROR_PREFIX}deserialization error: {0}")]
    Deserialize(String),
}

/// Convenience alias for results returned by cache store operations.
pub type CacheStoreResult<T> = Result<T, CacheStoreError>;

/// A generic asynchronous cache store.
///
/// The `CacheStore` trait abstracts over different cache backends. Keys are
/// strings; values cross the boundary as [`serde_json::Value`], with the
/// store responsible for the raw encoding it persists. All operations go
/// against shared state and take `&self`; implementations must be safe for
/// concurrent use.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value by key. Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> CacheStoreResult<Option<Value>>;

    /// Insert a value under the given key with the given expiration policy.
    /// Overwrites any existing value.
    async fn insert(&self, key: String, value: Value, expiry: Timeout) -> CacheStoreResult<()>;

    /// Remove a value by key. Succeeds even if the key was absent.
    async fn remove(&self, key: &str) -> CacheStoreResult<()>;

    /// Clear all entries in the store.
    async fn clear(&self) -> CacheStoreResult<()>;

    /// Remove every key that contains `pattern` as a case-sensitive
    /// substring, returning the number of keys removed.
    ///
    /// An empty pattern matches every key and falls back to [`clear`], with
    /// the store's last reported size as a best-effort count. Enumeration and
    /// deletion are not transactional: keys written concurrently with the
    /// sweep may or may not be visited.
    ///
    /// [`clear`]: CacheStore::clear
    async fn clear_matching(&self, pattern: &str) -> CacheStoreResult<usize>;

    /// Return the approximate number of entries in the store.
    async fn approx_size(&self) -> CacheStoreResult<usize>;

    /// Returns `true` if the store contains the specified key.
    async fn contains_key(&self, key: &str) -> CacheStoreResult<bool>;
}
