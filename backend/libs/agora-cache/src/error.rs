//! Cache error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Value at {0} is not an integer")]
    NotAnInteger(String),

    #[error("Increment of {0} would overflow")]
    Overflow(String),
}

impl CacheError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Redis(_) => "redis",
            CacheError::Serialization(_) => "serialization",
            CacheError::Timeout(_) => "timeout",
            CacheError::NotAnInteger(_) => "not_integer",
            CacheError::Overflow(_) => "overflow",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
