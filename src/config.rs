//! Configuration types for the cache.
//!
//! Everything in this module is an immutable value captured at construction
//! time: the connection URL, the store selection, and the default expiration
//! policy. The types derive `serde` traits so a configuration can be loaded
//! from a TOML file, and expose fluent builders for configuration in code.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use aside::config::{CacheConfig, CacheStoreConfig, CacheStoreTypeConfig, Timeout};
//!
//! let config = CacheConfig::builder()
//!     .store(
//!         CacheStoreConfig::builder()
//!             .store_type(CacheStoreTypeConfig::Memory)
//!             .build(),
//!     )
//!     .prefix("v1")
//!     .timeout(Timeout::After(Duration::from_secs(1800)))
//!     .build();
//! # assert_eq!(config.prefix.as_deref(), Some("v1"));
//! ```

use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// The default maximum number of connections in a store's connection pool.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// A URL pointing at an external cache store.
///
/// This is a thin wrapper over the store-specific connection string syntax
/// (for Redis: `redis://[user:password@]host[:port][/db]`). The URL is
/// captured once at construction and never mutated afterwards.
///
/// # Examples
///
/// ```
/// use aside::config::CacheUrl;
///
/// let url = CacheUrl::from("redis://127.0.0.1/");
/// assert!(url.is_redis());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheUrl(String);

impl CacheUrl {
    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the URL uses one of the Redis schemes
    /// (`redis://`, `rediss://`, or `redis+unix://`).
    #[must_use]
    pub fn is_redis(&self) -> bool {
        self.0.starts_with("redis://")
            || self.0.starts_with("rediss://")
            || self.0.starts_with("redis+unix://")
    }
}

impl From<&str> for CacheUrl {
    fn from(url: &str) -> Self {
        Self(url.to_owned())
    }
}

impl From<String> for CacheUrl {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl Display for CacheUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An expiration policy for cached values.
///
/// The default is [`Timeout::Never`]: entries without an explicit policy stay
/// in the store until removed. [`Timeout::After`] expires an entry a duration
/// after it was written; stores apply it with whole-second resolution.
/// [`Timeout::AtDateTime`] expires an entry at an absolute point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Timeout {
    /// The entry never expires.
    #[default]
    Never,
    /// The entry expires this long after it is written.
    After(Duration),
    /// The entry expires at the given point in time.
    AtDateTime(DateTime<FixedOffset>),
}

impl Timeout {
    /// Converts a relative timeout into an absolute one, anchored at the
    /// current time. `Never` and `AtDateTime` are returned unchanged.
    ///
    /// A duration too large to represent as a datetime saturates to `Never`.
    #[must_use]
    pub fn canonicalize(self) -> Self {
        match self {
            Timeout::After(duration) => {
                let now = Utc::now().fixed_offset();
                chrono::Duration::from_std(duration)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .map_or(Timeout::Never, Timeout::AtDateTime)
            }
            other => other,
        }
    }

    /// Returns `true` if the policy has passed its deadline.
    ///
    /// `now` defaults to the current time. A relative `After` timeout has no
    /// anchor point and is never considered expired; stores canonicalize
    /// timeouts when an entry is written.
    #[must_use]
    pub fn is_expired(&self, now: Option<DateTime<FixedOffset>>) -> bool {
        match self {
            Timeout::Never | Timeout::After(_) => false,
            Timeout::AtDateTime(deadline) => {
                let now = now.unwrap_or_else(|| Utc::now().fixed_offset());
                *deadline <= now
            }
        }
    }
}

/// The kind of store backing a [`Cache`](crate::cache::Cache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStoreTypeConfig {
    /// A process-local in-memory store.
    #[default]
    Memory,
    /// A Redis server, addressed by [`CacheStoreConfig::url`].
    Redis,
}

/// Configuration of the store backing a [`Cache`](crate::cache::Cache).
///
/// # Examples
///
/// ```
/// use aside::config::{CacheStoreConfig, CacheStoreTypeConfig, CacheUrl};
///
/// let config = CacheStoreConfig::builder()
///     .store_type(CacheStoreTypeConfig::Redis)
///     .url(CacheUrl::from("redis://127.0.0.1/"))
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStoreConfig {
    /// The kind of store to use.
    pub store_type: CacheStoreTypeConfig,
    /// The URL of the external store. Required for [`CacheStoreTypeConfig::Redis`].
    pub url: Option<CacheUrl>,
    /// The maximum number of pooled connections to the external store.
    pub pool_size: usize,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            store_type: CacheStoreTypeConfig::default(),
            url: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl CacheStoreConfig {
    /// Creates a builder for this configuration.
    #[must_use]
    pub fn builder() -> CacheStoreConfigBuilder {
        CacheStoreConfigBuilder::default()
    }
}

/// A builder for [`CacheStoreConfig`].
#[derive(Debug, Default)]
pub struct CacheStoreConfigBuilder {
    config: CacheStoreConfig,
}

impl CacheStoreConfigBuilder {
    /// Sets the kind of store to use.
    #[must_use]
    pub fn store_type(mut self, store_type: CacheStoreTypeConfig) -> Self {
        self.config.store_type = store_type;
        self
    }

    /// Sets the URL of the external store.
    #[must_use]
    pub fn url(mut self, url: impl Into<CacheUrl>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Sets the maximum number of pooled connections.
    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> CacheStoreConfig {
        self.config
    }
}

/// Configuration for a [`Cache`](crate::cache::Cache).
///
/// # Examples
///
/// Loading from TOML:
///
/// ```
/// use aside::config::{CacheConfig, CacheStoreTypeConfig};
///
/// let config: CacheConfig = toml::from_str(
///     r#"
///     prefix = "v1"
///     timeout = "30m"
///
///     [store]
///     store_type = "redis"
///     url = "redis://127.0.0.1/"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.store.store_type, CacheStoreTypeConfig::Redis);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// An optional prefix prepended to every key as `{prefix}:{key}`.
    pub prefix: Option<String>,
    /// The default expiration policy for values inserted without an explicit
    /// one.
    #[serde(with = "crate::serializers::timeout")]
    pub timeout: Timeout,
    /// The store backing the cache.
    pub store: CacheStoreConfig,
}

impl CacheConfig {
    /// Creates a builder for this configuration.
    #[must_use]
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

/// A builder for [`CacheConfig`].
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Sets the store configuration.
    #[must_use]
    pub fn store(mut self, store: CacheStoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = Some(prefix.into());
        self
    }

    /// Sets the default expiration policy.
    #[must_use]
    pub fn timeout(mut self, timeout: Timeout) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_url_schemes() {
        assert!(CacheUrl::from("redis://127.0.0.1/").is_redis());
        assert!(CacheUrl::from("rediss://cache.example.com:6380/0").is_redis());
        assert!(CacheUrl::from("redis+unix:///var/run/redis.sock").is_redis());
        assert!(!CacheUrl::from("memcached://127.0.0.1/").is_redis());
    }

    #[test]
    fn timeout_canonicalize_anchors_relative() {
        let before = Utc::now().fixed_offset();
        let canonical = Timeout::After(Duration::from_secs(60)).canonicalize();

        match canonical {
            Timeout::AtDateTime(deadline) => {
                assert!(deadline > before);
                assert!(deadline <= before + chrono::Duration::seconds(61));
            }
            other => panic!("expected AtDateTime, got {other:?}"),
        }

        assert_eq!(Timeout::Never.canonicalize(), Timeout::Never);
    }

    #[test]
    fn timeout_expiry() {
        let now = Utc::now().fixed_offset();
        let past = Timeout::AtDateTime(now - chrono::Duration::seconds(1));
        let future = Timeout::AtDateTime(now + chrono::Duration::seconds(60));

        assert!(past.is_expired(Some(now)));
        assert!(!future.is_expired(Some(now)));
        assert!(!Timeout::Never.is_expired(Some(now)));
        assert!(!Timeout::After(Duration::from_secs(1)).is_expired(Some(now)));
    }

    #[test]
    fn config_from_toml() {
        let config: CacheConfig = toml::from_str(
            r#"
            prefix = "myapp"
            timeout = "90s"

            [store]
            store_type = "redis"
            url = "redis://127.0.0.1:6379/1"
            pool_size = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.prefix.as_deref(), Some("myapp"));
        assert_eq!(config.timeout, Timeout::After(Duration::from_secs(90)));
        assert_eq!(config.store.store_type, CacheStoreTypeConfig::Redis);
        assert_eq!(
            config.store.url,
            Some(CacheUrl::from("redis://127.0.0.1:6379/1"))
        );
        assert_eq!(config.store.pool_size, 4);
    }

    #[test]
    fn config_from_toml_defaults() {
        let config: CacheConfig = toml::from_str("").unwrap();

        assert_eq!(config.store.store_type, CacheStoreTypeConfig::Memory);
        assert_eq!(config.store.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.prefix, None);
        assert_eq!(config.timeout, Timeout::Never);
    }

    #[test]
    fn config_from_toml_datetime_timeout() {
        let config: CacheConfig = toml::from_str(
            r#"
            timeout = "2030-01-01T00:00:00+00:00"
            "#,
        )
        .unwrap();

        match config.timeout {
            Timeout::AtDateTime(deadline) => {
                assert_eq!(deadline.to_rfc3339(), "2030-01-01T00:00:00+00:00");
            }
            other => panic!("expected AtDateTime, got {other:?}"),
        }
    }

    #[test]
    fn timeout_toml_round_trip() {
        let config = CacheConfig::builder()
            .timeout(Timeout::After(Duration::from_secs(1800)))
            .build();

        let serialized = toml::to_string(&config).unwrap();
        let parsed: CacheConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.timeout, config.timeout);
    }
}
