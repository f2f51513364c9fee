//! The cache store contract and its namespacing implementation

use crate::backend::{KeyValueBackend, MemoryBackend, RedisBackend};
use crate::{CacheError, CacheMetrics, CacheResult};
use agora_common::{env_flag, env_optional, env_or, AppSettings};
use anyhow::Result;
use async_trait::async_trait;
use redis_utils::RedisPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Key-value cache capability used by rate limiting, generic caching and
/// the signup flow.
///
/// Only [`Store::is_alive`] reports backend failures. Every other operation
/// degrades: reads behave as a miss, writes and deletes become no-ops.
#[async_trait]
pub trait Store: Send + Sync {
    /// Store `value` under `key`; a zero `ttl` never expires.
    async fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Stored value, or an empty string when absent or unreachable.
    async fn get(&self, key: &str) -> String;

    async fn has(&self, key: &str) -> bool;

    /// Idempotent delete.
    async fn forget(&self, key: &str);

    /// Store `value` without expiry.
    async fn forever(&self, key: &str, value: &str);

    /// Clear the whole backend database. Test and reset use only.
    async fn flush(&self);

    async fn is_alive(&self) -> CacheResult<()>;

    async fn increment(&self, key: &str) {
        self.increment_by(key, 1).await
    }

    async fn increment_by(&self, key: &str, delta: i64);

    async fn decrement(&self, key: &str) {
        self.decrement_by(key, 1).await
    }

    async fn decrement_by(&self, key: &str, delta: i64);
}

/// Cache store settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Prepended to every key, e.g. `agora:cache:`
    pub prefix: String,
    /// Upper bound for a single backend round trip
    pub op_timeout: Duration,
    /// Store [`Store::forever`] entries under the caller's key, without the prefix.
    /// Only for reading entries written by older deployments.
    ///
    /// Older deployments also wrote every other key as `<app>:cache<key>`, with
    /// no separator. Sharing those entries needs `CACHE_KEY_PREFIX=<app>:cache`
    /// as well; this flag alone only covers `forever` keys.
    pub forever_raw_key: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::for_app(&AppSettings::default())
    }
}

impl CacheSettings {
    pub fn for_app(app: &AppSettings) -> Self {
        Self {
            prefix: format!("{}:", app.key_prefix("cache")),
            op_timeout: Duration::from_millis(500),
            forever_raw_key: false,
        }
    }

    pub fn from_env(app: &AppSettings) -> Result<Self> {
        let defaults = Self::for_app(app);
        Ok(Self {
            prefix: env_optional("CACHE_KEY_PREFIX").unwrap_or(defaults.prefix),
            op_timeout: Duration::from_millis(env_or("CACHE_OP_TIMEOUT_MS", 500u64)?),
            forever_raw_key: env_flag("CACHE_FOREVER_RAW_KEY", false)?,
        })
    }
}

/// [`Store`] over any [`KeyValueBackend`], adding key prefixes, per-call
/// timeouts, logging and metrics.
pub struct CacheStore<B> {
    backend: Arc<B>,
    settings: Arc<CacheSettings>,
    deadline: Option<Instant>,
    metrics: CacheMetrics,
}

impl<B> Clone for CacheStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            settings: self.settings.clone(),
            deadline: self.deadline,
            metrics: self.metrics.clone(),
        }
    }
}

/// The production store.
pub type RedisStore = CacheStore<RedisBackend>;

/// In-process store for tests.
pub type MemoryStore = CacheStore<MemoryBackend>;

impl RedisStore {
    pub fn from_pool(pool: &RedisPool, settings: CacheSettings) -> Self {
        Self::new(Arc::new(RedisBackend::from_pool(pool)), settings)
    }
}

impl MemoryStore {
    pub fn in_memory(settings: CacheSettings) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), settings)
    }
}

impl<B: KeyValueBackend> CacheStore<B> {
    pub fn new(backend: Arc<B>, settings: CacheSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            deadline: None,
            metrics: CacheMetrics::default(),
        }
    }

    /// Copy of this store whose backend calls also stop at `deadline`,
    /// typically the deadline of the request being served.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Namespaced backend key.
    pub fn cache_key(&self, key: &str) -> String {
        format!("{}{}", self.settings.prefix, key)
    }

    fn forever_key(&self, key: &str) -> String {
        if self.settings.forever_raw_key {
            key.to_string()
        } else {
            self.cache_key(key)
        }
    }

    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(self.settings.op_timeout),
            None => self.settings.op_timeout,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>> + Send,
    {
        let budget = self.budget();
        match timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(budget)),
        }
    }

    /// Log and count a backend failure that the caller will not see.
    fn degrade(&self, op: &'static str, key: &str, err: &CacheError) {
        warn!(op, key = %key, error = %err, "Cache backend error, degrading");
        self.metrics.record_error(op, err.kind());
    }
}

#[async_trait]
impl<B: KeyValueBackend + 'static> Store for CacheStore<B> {
    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let key = self.cache_key(key);
        match self.bounded(self.backend.set(&key, value, ttl)).await {
            Ok(()) => {
                debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
                self.metrics.record_write();
            }
            Err(e) => self.degrade("set", &key, &e),
        }
    }

    async fn get(&self, key: &str) -> String {
        let key = self.cache_key(key);
        match self.bounded(self.backend.get(&key)).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                self.metrics.record_hit();
                value
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.metrics.record_miss();
                String::new()
            }
            Err(e) => {
                self.degrade("get", &key, &e);
                String::new()
            }
        }
    }

    async fn has(&self, key: &str) -> bool {
        let key = self.cache_key(key);
        match self.bounded(self.backend.exists(&key)).await {
            Ok(exists) => exists,
            Err(e) => {
                self.degrade("has", &key, &e);
                false
            }
        }
    }

    async fn forget(&self, key: &str) {
        let key = self.cache_key(key);
        match self.bounded(self.backend.del(&key)).await {
            Ok(()) => {
                debug!(key = %key, "Cache delete");
                self.metrics.record_delete();
            }
            Err(e) => self.degrade("forget", &key, &e),
        }
    }

    async fn forever(&self, key: &str, value: &str) {
        let key = self.forever_key(key);
        match self
            .bounded(self.backend.set(&key, value, Duration::ZERO))
            .await
        {
            Ok(()) => {
                debug!(key = %key, "Cache set forever");
                self.metrics.record_write();
            }
            Err(e) => self.degrade("forever", &key, &e),
        }
    }

    async fn flush(&self) {
        match self.bounded(self.backend.flush()).await {
            Ok(()) => warn!("Cache database flushed"),
            Err(e) => self.degrade("flush", "*", &e),
        }
    }

    async fn is_alive(&self) -> CacheResult<()> {
        self.bounded(self.backend.ping()).await
    }

    async fn increment_by(&self, key: &str, delta: i64) {
        let key = self.cache_key(key);
        match self.bounded(self.backend.incr_by(&key, delta)).await {
            Ok(value) => debug!(key = %key, delta, value, "Cache counter updated"),
            Err(e) => self.degrade("increment", &key, &e),
        }
    }

    async fn decrement_by(&self, key: &str, delta: i64) {
        match delta.checked_neg() {
            Some(negated) => self.increment_by(key, negated).await,
            None => {
                let key = self.cache_key(key);
                self.degrade("decrement", &key, &CacheError::Overflow(key.clone()));
            }
        }
    }
}
