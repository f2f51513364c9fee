//! Agora shared settings
//!
//! Application identity and runtime environment, read once at startup and
//! passed explicitly to the libraries that need them (key prefixes, expiry
//! policy, link building).

pub mod env_utils;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use env_utils::{env_flag, env_optional, env_or, env_string_or};

/// Runtime environment the process is deployed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Local,
    Testing,
    Production,
}

impl AppEnv {
    /// Unknown values are treated as production.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "dev" | "development" => AppEnv::Local,
            "test" | "testing" => AppEnv::Testing,
            _ => AppEnv::Production,
        }
    }
}

/// Application settings shared by every library in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Application name, used to namespace shared Redis keys
    pub name: String,
    pub env: AppEnv,
    /// Public base URL, e.g. `https://forum.example.com`
    pub url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "agora".to_string(),
            env: AppEnv::Production,
            url: "http://localhost:3000".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings, reading a `.env` file first in debug builds.
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let name = env_string_or("APP_NAME", "agora");
        if name.trim().is_empty() {
            anyhow::bail!("APP_NAME must not be empty");
        }

        let url = env_string_or("APP_URL", "http://localhost:3000");
        let env = AppEnv::parse(&env_string_or("APP_ENV", "production"));

        Ok(Self { name, env, url })
    }

    pub fn is_local(&self) -> bool {
        self.env == AppEnv::Local
    }

    /// Absolute URL of an API path, e.g. `api_url("/v1/topics")`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Key prefix for a named component, e.g. `agora:cache`.
    pub fn key_prefix(&self, component: &str) -> String {
        format!("{}:{}", self.name, component)
    }
}
