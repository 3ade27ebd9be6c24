//! The cache facade: typed reads and writes over a pluggable store.
//!
//! [`Cache`] wraps a [`CacheStore`] implementation and provides a convenient
//! interface for storing and retrieving values. Values are serialized to JSON
//! for storage and deserialized when retrieved; keys can be namespaced with a
//! prefix to avoid collisions between different parts of an application.
//!
//! # Basic Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use aside::cache::Cache;
//! use aside::cache::store::memory::Memory;
//! use aside::config::Timeout;
//!
//! #[tokio::main]
//! async fn main() -> aside::cache::CacheResult<()> {
//!     let store = Arc::new(Memory::new());
//!     let cache = Cache::new(store, Some("v1".to_string()), Timeout::Never);
//!
//!     // Store a value
//!     cache.insert("user:123", "John Doe").await?;
//!
//!     // Retrieve a value
//!     let user: Option<String> = cache.get("user:123").await?;
//!     assert_eq!(user, Some("John Doe".to_string()));
//!
//!     // Lazily compute on miss
//!     let expensive: String = cache
//!         .get_or_insert_with("expensive", || async {
//!             Ok("computed result".to_string())
//!         })
//!         .await?;
//!     assert_eq!(expensive, "computed result");
//!
//!     Ok(())
//! }
//! ```

pub mod store;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::cache::store::memory::Memory;
#[cfg(feature = "redis")]
use crate::cache::store::redis::Redis;
use crate::cache::store::{CacheStore, CacheStoreError};
use crate::config::{CacheConfig, CacheStoreTypeConfig, Timeout};

/// An error that can occur when interacting with the cache.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// An error occurred during JSON serialization or deserialization.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// An error occurred in the underlying cache store.
    #[error(transparent)]
    Store(#[from] CacheStoreError),
    /// A caller-supplied generator failed. No cache write occurred.
    #[error("generator error: {0}")]
    Generator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    /// Wraps a generator failure so it can be returned from the closures
    /// passed to [`Cache::get_or_insert_with`] and friends.
    ///
    /// # Examples
    ///
    /// ```
    /// use aside::cache::CacheError;
    ///
    /// let err = CacheError::generator("database offline");
    /// assert_eq!(err.to_string(), "generator error: database offline");
    /// ```
    #[must_use]
    pub fn generator(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Generator(err.into())
    }
}

/// A type alias for results that can contain a [`CacheError`].
pub type CacheResult<T> = Result<T, CacheError>;

/// A high-level cache interface that provides automatic serialization and
/// deserialization of values.
///
/// # Key Formatting
///
/// If a prefix is set, all keys are formatted as `{prefix}:{key}` before they
/// reach the store. The pattern given to [`Cache::clear_matching`] is matched
/// against the full stored key, prefix included.
///
/// # Concurrency
///
/// A `Cache` is cheap to clone and safe to share between tasks. The
/// read-then-write sequence in [`Cache::get_or_insert_with`] is not atomic:
/// two callers that miss on the same key both run their generator and both
/// write, and the last write wins.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    prefix: Option<String>,
    expiry: Timeout,
}

impl Cache {
    /// Creates a new cache instance with the specified store, key prefix, and
    /// default expiration policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// use aside::cache::Cache;
    /// use aside::cache::store::memory::Memory;
    /// use aside::config::Timeout;
    ///
    /// let store = Arc::new(Memory::new());
    /// let cache = Cache::new(
    ///     store,
    ///     Some("myapp".to_string()),
    ///     Timeout::After(Duration::from_secs(3600)),
    /// );
    /// ```
    pub fn new(store: Arc<dyn CacheStore>, prefix: Option<String>, expiry: Timeout) -> Self {
        Self {
            store,
            prefix,
            expiry,
        }
    }

    /// Creates a new cache instance from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured store cannot be initialized, or if
    /// the configuration selects a Redis store without a URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use aside::cache::Cache;
    /// use aside::config::{CacheConfig, CacheStoreConfig, CacheStoreTypeConfig};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> aside::cache::CacheResult<()> {
    /// let config = CacheConfig::builder()
    ///     .store(
    ///         CacheStoreConfig::builder()
    ///             .store_type(CacheStoreTypeConfig::Memory)
    ///             .build(),
    ///     )
    ///     .prefix("v1")
    ///     .build();
    ///
    /// let cache = Cache::from_config(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let store_cfg = &config.store;

        let store: Arc<dyn CacheStore> = match store_cfg.store_type {
            CacheStoreTypeConfig::Memory => Arc::new(Memory::new()),
            #[cfg(feature = "redis")]
            CacheStoreTypeConfig::Redis => {
                let url = store_cfg.url.clone().ok_or_else(|| {
                    CacheStoreError::Backend("redis cache store requires a url".to_owned())
                })?;
                Arc::new(Redis::new(url, store_cfg.pool_size).await?)
            }
            #[cfg(not(feature = "redis"))]
            CacheStoreTypeConfig::Redis => {
                return Err(CacheStoreError::Backend(
                    "cache store type `redis` requires the `redis` crate feature".to_owned(),
                )
                .into());
            }
        };

        Ok(Self::new(store, config.prefix.clone(), config.timeout))
    }

    /// Formats a key with the cache prefix if one is set.
    fn format_key<K: AsRef<str>>(&self, key: K) -> String {
        let k = key.as_ref();
        if let Some(pref) = &self.prefix {
            return format!("{pref}:{k}");
        }
        k.to_string()
    }

    /// Retrieves a value from the cache.
    ///
    /// Returns `Some(value)` if the key exists and the value can be
    /// deserialized, or `None` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be deserialized into
    /// `V`, or if the store cannot be reached. A malformed entry surfaces as
    /// an error, never as `None`.
    pub async fn get<K, V>(&self, key: K) -> CacheResult<Option<V>>
    where
        K: AsRef<str>,
        V: DeserializeOwned,
    {
        let k = self.format_key(key.as_ref());
        let result = self
            .store
            .get(&k)
            .await?
            .map(serde_json::from_value)
            .transpose()?;
        Ok(result)
    }

    /// Stores a value in the cache with the default expiration policy.
    ///
    /// The value is serialized to JSON before storage. If the key already
    /// exists, the value is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or if there was a
    /// problem accessing the cache store.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use aside::cache::Cache;
    /// use aside::cache::store::memory::Memory;
    /// use aside::config::Timeout;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize, Debug)]
    /// struct User {
    ///     id: u32,
    ///     name: String,
    /// }
    ///
    /// #[tokio::main]
    /// async fn main() -> aside::cache::CacheResult<()> {
    ///     let store = Arc::new(Memory::new());
    ///     let cache = Cache::new(store, None, Timeout::Never);
    ///
    ///     cache.insert("greeting", "Hello, World!").await?;
    ///
    ///     let user = User {
    ///         id: 123,
    ///         name: "John Doe".to_string(),
    ///     };
    ///     cache.insert("user:123", &user).await?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub async fn insert<K, V>(&self, key: K, value: V) -> CacheResult<()>
    where
        K: Into<String>,
        V: Serialize,
    {
        self.insert_expiring(key, value, self.expiry).await
    }

    /// Stores a value in the cache with a custom expiration policy,
    /// overriding the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or if there was a
    /// problem accessing the cache store.
    pub async fn insert_expiring<K, V>(&self, key: K, value: V, expiry: Timeout) -> CacheResult<()>
    where
        K: Into<String>,
        V: Serialize,
    {
        let k = self.format_key(key.into());
        self.store
            .insert(k, serde_json::to_value(value)?, expiry)
            .await?;
        Ok(())
    }

    /// Computes a value and stores it under `key` with the default expiration
    /// policy. The computation runs every time this method is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation fails, the value cannot be
    /// serialized, or the store cannot be reached.
    pub async fn insert_with<F, Fut, K, V>(&self, key: K, f: F) -> CacheResult<()>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = CacheResult<V>> + Send,
        K: Into<String>,
        V: Serialize,
    {
        let computed_value = f().await?;
        self.insert(key.into(), computed_value).await?;
        Ok(())
    }

    /// Gets a value from the cache, or computes, stores, and returns it if
    /// not present.
    ///
    /// This is the cache-aside operation: one store read always; on a hit the
    /// stored value is deserialized and returned and the generator is never
    /// invoked; on a miss the generator runs exactly once, its result is
    /// serialized and written with the facade's default expiration policy,
    /// and the freshly computed value is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator fails (no cache write occurs), if
    /// the computed value cannot be serialized (no cache write occurs and the
    /// value is not returned), if a stored payload cannot be deserialized, or
    /// if the store cannot be reached.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use aside::cache::Cache;
    /// use aside::cache::store::memory::Memory;
    /// use aside::config::Timeout;
    ///
    /// #[tokio::main]
    /// async fn main() -> aside::cache::CacheResult<()> {
    ///     let store = Arc::new(Memory::new());
    ///     let cache = Cache::new(store, None, Timeout::Never);
    ///
    ///     let value1: String = cache
    ///         .get_or_insert_with("expensive", || async { Ok("computed result".to_string()) })
    ///         .await?;
    ///
    ///     // The second generator is never invoked; the cached value wins.
    ///     let value2: String = cache
    ///         .get_or_insert_with("expensive", || async { Ok("different result".to_string()) })
    ///         .await?;
    ///
    ///     assert_eq!(value1, value2);
    ///     Ok(())
    /// }
    /// ```
    pub async fn get_or_insert_with<F, Fut, K, V>(&self, key: K, f: F) -> CacheResult<V>
    where
        K: Into<String>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = CacheResult<V>> + Send,
        V: DeserializeOwned + Serialize,
    {
        self.get_or_insert_expiring_with(key, f, self.expiry).await
    }

    /// Gets a value from the cache, or computes, stores with a custom
    /// expiration policy, and returns it.
    ///
    /// Behaves like [`Cache::get_or_insert_with`] with `expiry` in place of
    /// the facade's default.
    ///
    /// # Errors
    ///
    /// See [`Cache::get_or_insert_with`].
    pub async fn get_or_insert_expiring_with<F, Fut, K, V>(
        &self,
        key: K,
        f: F,
        expiry: Timeout,
    ) -> CacheResult<V>
    where
        K: Into<String>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = CacheResult<V>> + Send,
        V: DeserializeOwned + Serialize,
    {
        let key = key.into();
        if let Some(value) = self.get(&key).await? {
            return Ok(value);
        }

        let computed_value = f().await?;
        self.insert_expiring(key, &computed_value, expiry).await?;
        Ok(computed_value)
    }

    /// Removes a value from the cache.
    ///
    /// If the key doesn't exist, this operation is a no-op and no error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    pub async fn remove<K: AsRef<str>>(&self, key: K) -> CacheResult<()> {
        let k = self.format_key(key.as_ref());
        self.store.remove(&k).await?;
        Ok(())
    }

    /// Removes all values from the store.
    ///
    /// Destructive and irreversible. On a Redis store this issues `FLUSHDB`
    /// and removes every key in the database, including keys written by other
    /// clients and keys outside this cache's prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    pub async fn clear(&self) -> CacheResult<()> {
        self.store.clear().await?;
        Ok(())
    }

    /// Removes every key that contains `pattern` as a case-sensitive,
    /// unanchored substring, returning the number of keys deleted.
    ///
    /// The pattern is matched against full stored keys (prefix included),
    /// across the whole store, not just keys written through this facade. An
    /// empty pattern clears the entire store. Enumeration and deletion are
    /// not transactional: keys written concurrently with the sweep may
    /// survive it.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use aside::cache::Cache;
    /// use aside::cache::store::memory::Memory;
    /// use aside::config::Timeout;
    ///
    /// #[tokio::main]
    /// async fn main() -> aside::cache::CacheResult<()> {
    ///     let store = Arc::new(Memory::new());
    ///     let cache = Cache::new(store, None, Timeout::Never);
    ///
    ///     cache.insert("user:1", "Alice").await?;
    ///     cache.insert("user:2", "Bob").await?;
    ///     cache.insert("order:1", "Widget").await?;
    ///
    ///     let removed = cache.clear_matching("user:").await?;
    ///     assert_eq!(removed, 2);
    ///
    ///     let order: Option<String> = cache.get("order:1").await?;
    ///     assert!(order.is_some());
    ///     Ok(())
    /// }
    /// ```
    pub async fn clear_matching<P: AsRef<str>>(&self, pattern: P) -> CacheResult<usize> {
        let removed = self.store.clear_matching(pattern.as_ref()).await?;
        Ok(removed)
    }

    /// Returns the approximate number of entries in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    pub async fn len(&self) -> CacheResult<usize> {
        let result = self.store.approx_size().await?;
        Ok(result)
    }

    /// Returns `true` if the store contains no entries.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    pub async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns `true` if the cache contains the specified key.
    ///
    /// # Errors
    ///
    /// Returns an error if there was a problem accessing the cache store.
    pub async fn contains_key<K: AsRef<str>>(&self, key: K) -> CacheResult<bool> {
        let k = self.format_key(key.as_ref());
        let result = self.store.contains_key(&k).await?;
        Ok(result)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("store", &"<CacheStore>")
            .field("prefix", &self.prefix)
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::cache::store::memory::Memory;
    use crate::config::{CacheStoreConfig, Timeout};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        email: String,
    }

    fn make_cache() -> Cache {
        let store = Arc::new(Memory::new());
        Cache::new(store, None, Timeout::Never)
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = make_cache();

        cache.insert("user:1", "John Doe").await.unwrap();
        let user: Option<String> = cache.get("user:1").await.unwrap();
        assert_eq!(user, Some("John Doe".to_string()));

        cache.remove("user:1").await.unwrap();
        let user: Option<String> = cache.get("user:1").await.unwrap();
        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn test_cache_with_prefix() {
        let store = Arc::new(Memory::new());
        let cache = Cache::new(
            store.clone(),
            Some("myapp".to_string()),
            Timeout::Never,
        );

        cache.insert("user:1", "John Doe").await.unwrap();

        // The prefix is applied on the way into the store.
        let raw = store.get("myapp:user:1").await.unwrap();
        assert_eq!(raw, Some(json!("John Doe")));

        let user: Option<String> = cache.get("user:1").await.unwrap();
        assert_eq!(user, Some("John Doe".to_string()));
    }

    #[tokio::test]
    async fn test_cache_complex_objects() {
        let cache = make_cache();

        let user = User {
            id: 1,
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
        };

        cache.insert("user:1", &user).await.unwrap();
        let cached_user: Option<User> = cache.get("user:1").await.unwrap();
        assert_eq!(cached_user, Some(user));
    }

    #[tokio::test]
    async fn test_round_trip_value_shapes() {
        let cache = make_cache();

        let values = [
            json!(42),
            json!(-7.5),
            json!("a string"),
            json!(true),
            json!([1, 2, 3]),
            json!({ "nested": { "list": ["a", "b"], "n": 1 } }),
        ];

        for (i, value) in values.iter().enumerate() {
            let key = format!("shape:{i}");
            let stored: serde_json::Value = cache
                .get_or_insert_with(key.clone(), || async { Ok(value.clone()) })
                .await
                .unwrap();
            assert_eq!(&stored, value);

            // Re-read without a generator involved.
            let reread: Option<serde_json::Value> = cache.get(&key).await.unwrap();
            assert_eq!(reread.as_ref(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_get_or_insert_with_computes_once() {
        let cache = make_cache();

        let mut call_count = 0;

        let value1: String = cache
            .get_or_insert_with("expensive", || async {
                call_count += 1;
                Ok("computed".to_string())
            })
            .await
            .unwrap();

        // Second call must hit the cache and never invoke its generator.
        let value2: String = cache
            .get_or_insert_with("expensive", || async {
                call_count += 1;
                Ok("different".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value1, "computed");
        assert_eq!(value1, value2);
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_expiration_honored() {
        let cache = make_cache();

        let first: String = cache
            .get_or_insert_expiring_with(
                "ephemeral",
                || async { Ok("first".to_string()) },
                Timeout::After(Duration::from_millis(40)),
            )
            .await
            .unwrap();
        assert_eq!(first, "first");

        tokio::time::sleep(Duration::from_millis(80)).await;

        let second: String = cache
            .get_or_insert_with("ephemeral", || async { Ok("second".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, "second");
    }

    #[tokio::test]
    async fn test_no_expiration_persists() {
        let cache = make_cache();

        let mut call_count = 0;
        let _: String = cache
            .get_or_insert_with("durable", || async {
                call_count += 1;
                Ok("kept".to_string())
            })
            .await
            .unwrap();

        // Much larger than any TTL used elsewhere in this suite.
        tokio::time::sleep(Duration::from_millis(150)).await;

        let value: String = cache
            .get_or_insert_with("durable", || async {
                call_count += 1;
                Ok("recomputed".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "kept");
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_generator_error_writes_no_entry() {
        let cache = make_cache();

        let result: CacheResult<String> = cache
            .get_or_insert_with("flaky", || async {
                Err(CacheError::generator("database offline"))
            })
            .await;
        assert!(matches!(result, Err(CacheError::Generator(_))));
        assert!(!cache.contains_key("flaky").await.unwrap());

        // No poisoned entry: a succeeding generator still runs.
        let value: String = cache
            .get_or_insert_with("flaky", || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
    }

    #[tokio::test]
    async fn test_deserialization_mismatch_is_an_error() {
        let cache = make_cache();

        cache.insert("count", "not a number").await.unwrap();

        let result: CacheResult<Option<u32>> = cache.get("count").await;
        assert!(matches!(result, Err(CacheError::SerdeJson(_))));
    }

    #[tokio::test]
    async fn test_clear_matching_selectivity() {
        let cache = make_cache();

        cache.insert("user:1", 1).await.unwrap();
        cache.insert("user:2", 2).await.unwrap();
        cache.insert("order:1", 3).await.unwrap();

        let removed = cache.clear_matching("user:").await.unwrap();

        assert_eq!(removed, 2);
        assert!(!cache.contains_key("user:1").await.unwrap());
        assert!(!cache.contains_key("user:2").await.unwrap());
        assert_eq!(cache.get::<_, u32>("order:1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_clear_matching_empty_pattern_clears_all() {
        let cache = make_cache();

        cache.insert("user:1", 1).await.unwrap();
        cache.insert("order:1", 2).await.unwrap();

        let removed = cache.clear_matching("").await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_all() {
        let cache = make_cache();

        cache.insert("key1", "value1").await.unwrap();
        cache.insert("key2", "value2").await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty().await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_statistics() {
        let cache = make_cache();

        assert!(cache.is_empty().await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 0);

        cache.insert("key1", "value1").await.unwrap();
        cache.insert("key2", "value2").await.unwrap();

        assert!(!cache.is_empty().await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cache_contains_key() {
        let cache = make_cache();

        assert!(!cache.contains_key("nonexistent").await.unwrap());

        cache.insert("existing", "value").await.unwrap();
        assert!(cache.contains_key("existing").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_config_memory() {
        let config = CacheConfig::builder()
            .store(CacheStoreConfig::builder().build())
            .prefix("v1")
            .build();

        let cache = Cache::from_config(&config).await.unwrap();
        cache.insert("k", 7).await.unwrap();
        assert_eq!(cache.get::<_, u32>("k").await.unwrap(), Some(7));
    }
}
