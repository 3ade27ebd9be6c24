//! `aside` is a cache-aside layer for Redis.
//!
//! Given a key, [`Cache`] returns the cached value if present, or computes it
//! with a caller-supplied generator, stores it with an optional expiration,
//! and returns it. Bulk invalidation is available as a full flush
//! ([`Cache::clear`]) or a substring-pattern sweep
//! ([`Cache::clear_matching`]).
//!
//! Values are serialized to JSON for storage and deserialized on the way
//! back. The store behind the facade is pluggable: a Redis server (the
//! `redis` feature, enabled by default) or a process-local in-memory store
//! for development and tests.
//!
//! # Quickstart
//!
//! ```
//! use std::time::Duration;
//!
//! use aside::Cache;
//! use aside::config::{CacheConfig, CacheStoreConfig, CacheStoreTypeConfig, Timeout};
//!
//! #[tokio::main]
//! async fn main() -> aside::CacheResult<()> {
//!     let config = CacheConfig::builder()
//!         .store(
//!             CacheStoreConfig::builder()
//!                 .store_type(CacheStoreTypeConfig::Memory)
//!                 .build(),
//!         )
//!         .prefix("v1")
//!         .timeout(Timeout::After(Duration::from_secs(1800)))
//!         .build();
//!
//!     let cache = Cache::from_config(&config).await?;
//!
//!     // Compute on the first call, read from the cache on the second.
//!     let report: String = cache
//!         .get_or_insert_with("report:today", || async {
//!             Ok("42 widgets sold".to_string())
//!         })
//!         .await?;
//!     assert_eq!(report, "42 widgets sold");
//!
//!     // Invalidate everything under the `report:` namespace.
//!     cache.clear_matching("report:").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! Pointing the same code at a Redis server is a configuration change:
//!
//! ```no_run
//! use aside::config::{CacheStoreConfig, CacheStoreTypeConfig, CacheUrl};
//!
//! let store = CacheStoreConfig::builder()
//!     .store_type(CacheStoreTypeConfig::Redis)
//!     .url(CacheUrl::from("redis://127.0.0.1/"))
//!     .build();
//! ```

pub mod cache;
pub mod config;
pub(crate) mod serializers;

pub use cache::{Cache, CacheError, CacheResult};
