//! Typed helpers on top of [`Store`]

use crate::{CacheResult, Store};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait StoreExt: Store {
    /// Store `value` as JSON. Only encoding failures are reported.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let data = serde_json::to_string(value)?;
        self.set(key, &data, ttl).await;
        Ok(())
    }

    /// Decode a JSON value. Undecodable entries are removed and read as a miss.
    async fn get_json<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let data = self.get(key).await;
        if data.is_empty() {
            return None;
        }

        match serde_json::from_str::<T>(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache deserialization failed");
                self.forget(key).await;
                None
            }
        }
    }

    /// Counter value written by [`Store::increment`] and friends.
    async fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).await.parse().ok()
    }

    /// Cached value for `key`, or the result of `fallback`, stored for `ttl`
    /// when it succeeds.
    async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Duration, fallback: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(cached) = self.get_json::<T>(key).await {
            return Ok(cached);
        }

        let value = fallback().await?;
        if let Err(e) = self.set_json(key, &value, ttl).await {
            warn!(key = %key, error = %e, "Cache serialization failed");
        }
        Ok(value)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
