//! Raw key-value backends
//!
//! Backends take keys exactly as given and report every failure. Prefixing
//! and the degrade-to-miss policy live in [`crate::CacheStore`].

use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use redis_utils::{RedisPool, SharedConnectionManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Primitive operations a cache backend must provide.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Store `value`; a zero `ttl` stores it without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Atomically read and delete `key`. Of several concurrent callers, at
    /// most one sees the value.
    async fn take(&self, key: &str) -> CacheResult<Option<String>>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Drop every key in the backend's database.
    async fn flush(&self) -> CacheResult<()>;

    async fn ping(&self) -> CacheResult<()>;

    /// Atomically add `delta` to the integer at `key` (missing keys start at 0)
    /// and return the new value.
    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64>;
}

/// Redis backend over the process-wide connection manager.
#[derive(Clone)]
pub struct RedisBackend {
    redis: SharedConnectionManager,
}

impl RedisBackend {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }

    pub fn from_pool(pool: &RedisPool) -> Self {
        Self::new(pool.manager())
    }
}

/// `PX` rejects 0, so positive sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        let mut conn = self.redis.lock().await;
        cmd.query_async::<_, ()>(&mut *conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.lock().await;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn take(&self, key: &str) -> CacheResult<Option<String>> {
        // MULTI/EXEC instead of GETDEL, which needs Redis 6.2
        let mut conn = self.redis.lock().await;
        let (value,): (Option<String>,) = redis::pipe()
            .atomic()
            .get(key)
            .del(key)
            .ignore()
            .query_async(&mut *conn)
            .await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.redis.lock().await;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        redis::cmd("FLUSHDB").query_async::<_, ()>(&mut *conn).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        let _pong: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut conn = self.redis.lock().await;
        let value: i64 = redis::cmd("INCRBY")
            .arg(key)
            .arg(delta)
            .query_async(&mut *conn)
            .await?;
        Ok(value)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process backend for tests and single-node setups.
///
/// Expired entries are evicted lazily when touched. Counter updates run under
/// the map's shard lock, so concurrent increments never lose updates.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) value, evicting the entry if it has expired.
    fn live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));

        match found {
            Some((false, value)) => Some(value),
            Some((true, _)) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.live(key))
    }

    async fn take(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.value))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live(key).is_some())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new("0".to_string(), Duration::ZERO));

        if entry.is_expired(now) {
            *entry = Entry::new("0".to_string(), Duration::ZERO);
        }

        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| CacheError::NotAnInteger(key.to_string()))?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        // Like INCRBY, the existing expiry is kept.
        entry.value = next.to_string();
        Ok(next)
    }
}
