//! Agora cache store
//!
//! A small key-value capability shared by rate limiting, generic caching and
//! the signup flow:
//! - Every key is namespaced with a per-application prefix
//! - Backend failures degrade to a cold cache (miss / false / no-op), except
//!   for the liveness probe
//! - Counters are atomic at the backend (`INCRBY`), never read-modify-write
//! - Every backend round trip is bounded by a timeout, optionally tied to the
//!   caller's request deadline
//!
//! ```no_run
//! use agora_cache::{CacheSettings, RedisStore, Store};
//! use agora_common::AppSettings;
//! use redis_utils::{RedisPool, RedisSettings};
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let app = AppSettings::load()?;
//! let pool = RedisPool::connect(&RedisSettings::from_env("REDIS_CACHE_DB", 0)?).await?;
//! let cache = RedisStore::from_pool(&pool, CacheSettings::from_env(&app)?);
//!
//! cache.set("topics:hot", "[1,2,3]", Duration::from_secs(300)).await;
//! cache.increment("signup:attempts:10.0.0.1").await;
//! # Ok(())
//! # }
//! ```

mod error;
mod ext;
mod metrics;

pub mod backend;
pub mod store;

pub use backend::{KeyValueBackend, MemoryBackend, RedisBackend};
pub use error::{CacheError, CacheResult};
pub use ext::StoreExt;
pub use metrics::CacheMetrics;
pub use store::{CacheSettings, CacheStore, MemoryStore, RedisStore, Store};
