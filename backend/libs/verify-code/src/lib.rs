//! One-time verification codes
//!
//! Codes for phone/email verification and captcha answers live in the same
//! backend family as the cache, under their own prefix
//! (`<app-name>:verifycode:`). A code is single-use when read with
//! `clear = true`, and expires after a configurable number of minutes.
//! Local development uses its own, shorter expiry.

mod issuer;
mod store;

pub use issuer::VerifyCodeIssuer;
pub use store::{
    BackendVerifyCodeStore, MemoryVerifyCodeStore, RedisVerifyCodeStore, VerifyCodeStore,
};

use agora_common::{env_optional, env_or, AppSettings};
use anyhow::{bail, Result};
use std::time::Duration;

/// Verification code settings.
#[derive(Debug, Clone)]
pub struct VerifyCodeSettings {
    pub prefix: String,
    /// Minutes a code stays valid in production
    pub expire_minutes: u64,
    /// Minutes a code stays valid when running locally
    pub debug_expire_minutes: u64,
    /// Whether the application runs in local mode
    pub local: bool,
    pub code_length: usize,
    /// Fixed code issued in local mode
    pub debug_code: String,
    pub op_timeout: Duration,
}

impl VerifyCodeSettings {
    pub fn for_app(app: &AppSettings) -> Self {
        Self {
            prefix: format!("{}:", app.key_prefix("verifycode")),
            expire_minutes: 15,
            debug_expire_minutes: 5,
            local: app.is_local(),
            code_length: 6,
            debug_code: "123456".to_string(),
            op_timeout: Duration::from_millis(500),
        }
    }

    pub fn from_env(app: &AppSettings) -> Result<Self> {
        let defaults = Self::for_app(app);
        let settings = Self {
            prefix: env_optional("VERIFY_CODE_KEY_PREFIX").unwrap_or(defaults.prefix),
            expire_minutes: env_or("VERIFY_CODE_EXPIRE_MINUTES", defaults.expire_minutes)?,
            debug_expire_minutes: env_or(
                "VERIFY_CODE_DEBUG_EXPIRE_MINUTES",
                defaults.debug_expire_minutes,
            )?,
            local: defaults.local,
            code_length: env_or("VERIFY_CODE_LENGTH", defaults.code_length)?,
            debug_code: env_optional("VERIFY_CODE_DEBUG_CODE").unwrap_or(defaults.debug_code),
            op_timeout: Duration::from_millis(env_or("CACHE_OP_TIMEOUT_MS", 500u64)?),
        };

        if settings.expire_minutes == 0 || settings.debug_expire_minutes == 0 {
            bail!("Verify code expiry must be at least one minute");
        }
        if settings.code_length == 0 {
            bail!("VERIFY_CODE_LENGTH must be positive");
        }
        Ok(settings)
    }

    /// Lifetime of a freshly issued code.
    pub fn expire_time(&self) -> Duration {
        let minutes = if self.local {
            self.debug_expire_minutes
        } else {
            self.expire_minutes
        };
        Duration::from_secs(minutes * 60)
    }
}
