//! Verification code storage

use crate::VerifyCodeSettings;
use agora_cache::{CacheError, CacheMetrics, CacheResult, KeyValueBackend, MemoryBackend, RedisBackend};
use async_trait::async_trait;
use redis_utils::RedisPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// One-time code storage (SMS/email codes, captcha answers).
#[async_trait]
pub trait VerifyCodeStore: Send + Sync {
    /// Issue `value` for `id`, replacing any earlier code. Returns whether it was stored.
    async fn set(&self, id: &str, value: &str) -> bool;

    /// Stored code, or an empty string. With `clear`, the code is consumed.
    async fn get(&self, id: &str, clear: bool) -> String;

    /// Exact comparison of `answer` against the stored code.
    ///
    /// Unlike a plain `get(id, clear) == answer`, a missing or expired code
    /// never verifies, not even against an empty answer.
    async fn verify(&self, id: &str, answer: &str, clear: bool) -> bool {
        let stored = self.get(id, clear).await;
        !stored.is_empty() && stored == answer
    }
}

/// [`VerifyCodeStore`] over a cache backend.
pub struct BackendVerifyCodeStore<B> {
    backend: Arc<B>,
    settings: Arc<VerifyCodeSettings>,
    deadline: Option<Instant>,
    metrics: CacheMetrics,
}

impl<B> Clone for BackendVerifyCodeStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            settings: self.settings.clone(),
            deadline: self.deadline,
            metrics: self.metrics.clone(),
        }
    }
}

pub type RedisVerifyCodeStore = BackendVerifyCodeStore<RedisBackend>;

pub type MemoryVerifyCodeStore = BackendVerifyCodeStore<MemoryBackend>;

impl RedisVerifyCodeStore {
    pub fn from_pool(pool: &RedisPool, settings: VerifyCodeSettings) -> Self {
        Self::new(Arc::new(RedisBackend::from_pool(pool)), settings)
    }
}

impl MemoryVerifyCodeStore {
    pub fn in_memory(settings: VerifyCodeSettings) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), settings)
    }
}

impl<B: KeyValueBackend> BackendVerifyCodeStore<B> {
    pub fn new(backend: Arc<B>, settings: VerifyCodeSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            deadline: None,
            metrics: CacheMetrics::new("verifycode"),
        }
    }

    /// Copy of this store whose backend calls also stop at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn settings(&self) -> &VerifyCodeSettings {
        &self.settings
    }

    /// Backend key for `id`; reads, writes and deletes all go through it.
    pub fn store_key(&self, id: &str) -> String {
        format!("{}{}", self.settings.prefix, id)
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

    fn degrade(&self, op: &'static str, id: &str, err: &CacheError) {
        warn!(op, id = %mask_id(id), error = %err, "Verify code backend error");
        self.metrics.record_error(op, err.kind());
    }
}

#[async_trait]
impl<B: KeyValueBackend + 'static> VerifyCodeStore for BackendVerifyCodeStore<B> {
    async fn set(&self, id: &str, value: &str) -> bool {
        let key = self.store_key(id);
        let ttl = self.settings.expire_time();

        match self.bounded(self.backend.set(&key, value, ttl)).await {
            Ok(()) => {
                debug!(id = %mask_id(id), ttl_secs = ttl.as_secs(), "Verify code stored");
                self.metrics.record_write();
                true
            }
            Err(e) => {
                self.degrade("set", id, &e);
                false
            }
        }
    }

    async fn get(&self, id: &str, clear: bool) -> String {
        let key = self.store_key(id);

        // A clearing read is a single atomic take, so a code is handed out once
        let (op, read) = if clear {
            ("clear", self.bounded(self.backend.take(&key)).await)
        } else {
            ("get", self.bounded(self.backend.get(&key)).await)
        };

        match read {
            Ok(Some(value)) => {
                self.metrics.record_hit();
                if clear {
                    self.metrics.record_delete();
                }
                value
            }
            Ok(None) => {
                self.metrics.record_miss();
                String::new()
            }
            Err(e) => {
                self.degrade(op, id, &e);
                String::new()
            }
        }
    }
}

/// Keep the last four characters of an identifier for logs.
pub(crate) fn mask_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_common::{AppEnv, AppSettings};

    /// Memory backend behind a network-like delay on every call.
    struct DelayedBackend {
        inner: MemoryBackend,
        delay: Duration,
    }

    impl DelayedBackend {
        async fn pause(&self) {
            if self.delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.delay).await;
            }
        }
    }

    #[async_trait]
    impl KeyValueBackend for DelayedBackend {
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
            self.pause().await;
            self.inner.set(key, value, ttl).await
        }
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.pause().await;
            self.inner.get(key).await
        }
        async fn take(&self, key: &str) -> CacheResult<Option<String>> {
            self.pause().await;
            self.inner.take(key).await
        }
        async fn exists(&self, key: &str) -> CacheResult<bool> {
            self.pause().await;
            self.inner.exists(key).await
        }
        async fn del(&self, key: &str) -> CacheResult<()> {
            self.pause().await;
            self.inner.del(key).await
        }
        async fn flush(&self) -> CacheResult<()> {
            self.pause().await;
            self.inner.flush().await
        }
        async fn ping(&self) -> CacheResult<()> {
            self.pause().await;
            self.inner.ping().await
        }
        async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
            self.pause().await;
            self.inner.incr_by(key, delta).await
        }
    }

    fn delayed_store(delay: Duration) -> BackendVerifyCodeStore<DelayedBackend> {
        let backend = DelayedBackend {
            inner: MemoryBackend::new(),
            delay,
        };
        BackendVerifyCodeStore::new(Arc::new(backend), settings(AppEnv::Production))
    }

    fn settings(env: AppEnv) -> VerifyCodeSettings {
        let app = AppSettings {
            env,
            ..AppSettings::default()
        };
        VerifyCodeSettings::for_app(&app)
    }

    fn store() -> MemoryVerifyCodeStore {
        MemoryVerifyCodeStore::in_memory(settings(AppEnv::Production))
    }

    #[test]
    fn test_mask_id() {
        assert_eq!(mask_id("13800138000"), "*******8000");
        assert_eq!(mask_id("abc"), "***");
        assert_eq!(mask_id("user@example.com"), "************.com");
    }

    #[test]
    fn test_store_key_prefix() {
        assert_eq!(store().store_key("13800138000"), "agora:verifycode:13800138000");
    }

    #[tokio::test]
    async fn test_single_use_read() {
        let store = store();
        assert!(store.set("phone:13800138000", "1234").await);

        assert_eq!(store.get("phone:13800138000", true).await, "1234");
        assert_eq!(store.get("phone:13800138000", false).await, "");
    }

    #[tokio::test]
    async fn test_read_without_clear_keeps_code() {
        let store = store();
        store.set("email:a@b.c", "998877").await;

        assert_eq!(store.get("email:a@b.c", false).await, "998877");
        assert_eq!(store.get("email:a@b.c", false).await, "998877");
    }

    #[tokio::test]
    async fn test_clear_removes_namespaced_key() {
        let store = store();
        store.set("captcha:xyz", "abcd").await;
        store.get("captcha:xyz", true).await;

        let raw = store
            .backend()
            .exists("agora:verifycode:captcha:xyz")
            .await
            .unwrap();
        assert!(!raw);
    }

    #[tokio::test]
    async fn test_verify() {
        let store = store();
        store.set("id", "1234").await;

        assert!(!store.verify("id", "12345", false).await);
        assert!(!store.verify("id", "1234 ", false).await);
        assert!(store.verify("id", "1234", true).await);
        // Consumed by the clearing verify above
        assert!(!store.verify("id", "1234", true).await);
    }

    #[tokio::test]
    async fn test_missing_code_never_verifies() {
        let store = store();
        assert!(!store.verify("never-issued", "", false).await);
        assert!(!store.verify("never-issued", "0000", false).await);
    }

    #[tokio::test]
    async fn test_reissue_overwrites() {
        let store = store();
        store.set("id", "1111").await;
        store.set("id", "2222").await;
        assert!(!store.verify("id", "1111", false).await);
        assert!(store.verify("id", "2222", false).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_expires() {
        let store = store();
        store.set("id", "1234").await;

        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert_eq!(store.get("id", false).await, "1234");

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert_eq!(store.get("id", false).await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_mode_uses_debug_expiry() {
        let store = MemoryVerifyCodeStore::in_memory(settings(AppEnv::Local));
        store.set("id", "1234").await;

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        assert_eq!(store.get("id", false).await, "");
    }

    #[tokio::test]
    async fn test_concurrent_clearing_verifies_accept_once() {
        let store = delayed_store(Duration::ZERO);
        assert!(store.set("phone:1", "424242").await);

        let (first, second) = tokio::join!(
            store.verify("phone:1", "424242", true),
            store.verify("phone:1", "424242", true),
        );
        assert!(first ^ second, "first={} second={}", first, second);
        assert_eq!(store.get("phone:1", false).await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_clearing_reads_hand_out_code_once() {
        let store = delayed_store(Duration::ZERO);
        store.set("email:x@y.z", "777777").await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get("email:x@y.z", true).await })
            })
            .collect();

        let mut handed_out = 0;
        for task in tasks {
            if task.await.unwrap() == "777777" {
                handed_out += 1;
            }
        }
        assert_eq!(handed_out, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_caps_budget() {
        let store = delayed_store(Duration::from_secs(3600));
        assert_eq!(store.budget(), Duration::from_millis(500));

        let scoped = store.with_deadline(Instant::now() + Duration::from_millis(50));
        assert_eq!(scoped.budget(), Duration::from_millis(50));

        let started = Instant::now();
        assert!(!scoped.set("id", "1234").await);
        assert_eq!(scoped.get("id", true).await, "");
        assert!(started.elapsed() < Duration::from_millis(500));

        let later = store.with_deadline(Instant::now() + Duration::from_secs(60));
        assert_eq!(later.budget(), Duration::from_millis(500));
    }
}
