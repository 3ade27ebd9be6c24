//! Redis-backed cache store implementation.
//!
//! Values are stored as JSON text under their string keys, with expiration
//! delegated to the server (`SET` with `EX`/`EXAT`). Connections are checked
//! out of a [`deadpool_redis`] pool per operation; the pool is built once
//! from an immutable [`CacheUrl`] and establishes connections lazily, so a
//! failed connection attempt is never cached and the next operation retries.
//!
//! # Examples
//!
//! ```no_run
//! use aside::cache::store::redis::Redis;
//! use aside::config::CacheUrl;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Redis::new(CacheUrl::from("redis://127.0.0.1/"), 8)
//!     .await
//!     .unwrap();
//! # }
//! ```

use deadpool_redis::{Config, Connection, CreatePoolError, Pool, PoolConfig, PoolError, Runtime};
use redis::{AsyncCommands, SetExpiry, SetOptions};
use serde_json::Value;
use thiserror::Error;

use crate::cache::store::{CacheStore, CacheStoreError, CacheStoreResult};
use crate::config::{CacheUrl, Timeout};

/// Errors specific to the Redis cache store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RedisCacheStoreError {
    /// An error occurred during Redis connection pool creation.
    #[error("redis pool creation error: {0}")]
    PoolCreation(#[from] CreatePoolError),

    /// An error occurred during a pool connection checkout.
    #[error("redis pool connection error: {0}")]
    PoolConnection(#[from] PoolError),

    /// An error occurred during a Redis command execution.
    #[error("redis command error: {0}")]
    Command(#[from] redis::RedisError),

    /// The configured URL does not use a Redis scheme.
    #[error("invalid redis connection string: {0}")]
    InvalidConnectionString(String),

    /// An error occurred during JSON serialization.
    #[error("serialization error: {0}")]
    Serialize(serde_json::Error),

    /// An error occurred during JSON deserialization.
    #[error("deserialization error: {0}")]
    Deserialize(serde_json::Error),
}

impl From<RedisCacheStoreError> for CacheStoreError {
    fn from(err: RedisCacheStoreError) -> Self {
        match err {
            RedisCacheStoreError::Serialize(e) => CacheStoreError::Serialize(e.to_string()),
            RedisCacheStoreError::Deserialize(e) => CacheStoreError::Deserialize(e.to_string()),
            other => CacheStoreError::Backend(other.to_string()),
        }
    }
}

/// A Redis-backed cache store.
#[derive(Debug, Clone)]
pub struct Redis {
    pool: Pool,
}

impl Redis {
    /// Creates a new Redis cache store from a connection URL.
    ///
    /// Building the pool does not connect; the first checkout does.
    ///
    /// # Errors
    ///
    /// Returns [`RedisCacheStoreError::InvalidConnectionString`] if the URL
    /// does not use a Redis scheme, or
    /// [`RedisCacheStoreError::PoolCreation`] if the pool cannot be built.
    pub async fn new(url: CacheUrl, pool_size: usize) -> CacheStoreResult<Self> {
        if !url.is_redis() {
            return Err(
                RedisCacheStoreError::InvalidConnectionString(url.as_str().to_owned()).into(),
            );
        }

        let mut cfg = Config::from_url(url.as_str());
        cfg.pool = Some(PoolConfig::new(pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(RedisCacheStoreError::PoolCreation)?;

        Ok(Self { pool })
    }

    /// Checks a connection out of the pool.
    ///
    /// # Errors
    ///
    /// Returns [`RedisCacheStoreError::PoolConnection`] if no connection can
    /// be established or checked out.
    pub async fn get_connection(&self) -> Result<Connection, RedisCacheStoreError> {
        self.pool
            .get()
            .await
            .map_err(RedisCacheStoreError::PoolConnection)
    }
}

#[async_trait::async_trait]
impl CacheStore for Redis {
    async fn get(&self, key: &str) -> CacheStoreResult<Option<Value>> {
        let mut conn = self.get_connection().await?;
        let data = conn
            .get::<_, Option<String>>(key)
            .await
            .map_err(RedisCacheStoreError::Command)?;

        // This layer never writes an empty payload, so one can only appear
        // through a foreign writer. Report the key absent; the next write
        // repairs it.
        data.filter(|raw| !raw.is_empty())
            .map(|raw| {
                let value = serde_json::from_str::<Value>(&raw)
                    .map_err(RedisCacheStoreError::Deserialize)?;
                Ok(value)
            })
            .transpose()
    }

    async fn insert(&self, key: String, value: Value, expiry: Timeout) -> CacheStoreResult<()> {
        let mut conn = self.get_connection().await?;
        let data =
            serde_json::to_string(&value).map_err(RedisCacheStoreError::Serialize)?;

        let options = match expiry {
            Timeout::Never => SetOptions::default(),
            // The server rejects `EX 0`; sub-second durations round up.
            Timeout::After(duration) => SetOptions::default()
                .with_expiration(SetExpiry::EX(duration.as_secs().max(1))),
            Timeout::AtDateTime(deadline) => {
                let unix_timestamp = deadline.timestamp().max(0) as u64;
                SetOptions::default().with_expiration(SetExpiry::EXAT(unix_timestamp))
            }
        };

        conn.set_options::<_, _, bool>(key, data, options)
            .await
            .map_err(RedisCacheStoreError::Command)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheStoreResult<()> {
        let mut conn = self.get_connection().await?;
        conn.del::<_, usize>(key)
            .await
            .map_err(RedisCacheStoreError::Command)?;
        Ok(())
    }

    async fn clear(&self) -> CacheStoreResult<()> {
        let mut conn = self.get_connection().await?;
        tracing::debug!("flushing entire cache database");
        conn.flushdb::<bool>()
            .await
            .map_err(RedisCacheStoreError::Command)?;
        Ok(())
    }

    async fn clear_matching(&self, pattern: &str) -> CacheStoreResult<usize> {
        if pattern.is_empty() {
            let count = self.approx_size().await?;
            self.clear().await?;
            return Ok(count);
        }

        let mut conn = self.get_connection().await?;
        let mut matches = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, batch) = redis::cmd("SCAN")
                .arg(cursor)
                .query_async::<(u64, Vec<String>)>(&mut conn)
                .await
                .map_err(RedisCacheStoreError::Command)?;
            matches.extend(batch.into_iter().filter(|key| key.contains(pattern)));
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        let mut removed = 0;
        for key in matches {
            removed += conn
                .del::<_, usize>(key)
                .await
                .map_err(RedisCacheStoreError::Command)?;
        }
        tracing::debug!(pattern, removed, "removed keys matching pattern");
        Ok(removed)
    }

    async fn approx_size(&self) -> CacheStoreResult<usize> {
        let mut conn = self.get_connection().await?;
        let val = redis::cmd("DBSIZE")
            .query_async::<usize>(&mut conn)
            .await
            .map_err(RedisCacheStoreError::Command)?;
        Ok(val)
    }

    async fn contains_key(&self, key: &str) -> CacheStoreResult<bool> {
        let mut conn = self.get_connection().await?;
        let exists = conn
            .exists(key)
            .await
            .map_err(RedisCacheStoreError::Command)?;
        Ok(exists)
    }
}
