use agora_common::{env_optional, env_or, env_string_or};
use anyhow::{anyhow, Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis connection settings.
#[derive(Clone, Debug)]
pub struct RedisSettings {
    /// `host:port`
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: i64,
    pub connect_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            username: None,
            password: None,
            db: 0,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisSettings {
    /// Read `REDIS_ADDRESS`, `REDIS_USERNAME`, `REDIS_PASSWORD` and the database
    /// index from `db_var` (e.g. `REDIS_CACHE_DB`), defaulting to `default_db`.
    ///
    /// The cache and verification-code stores point at different databases
    /// of the same server, so the database variable is chosen by the caller.
    pub fn from_env(db_var: &str, default_db: i64) -> Result<Self> {
        Ok(Self {
            address: env_string_or("REDIS_ADDRESS", "127.0.0.1:6379"),
            username: env_optional("REDIS_USERNAME"),
            password: env_optional("REDIS_PASSWORD"),
            db: env_or(db_var, default_db)?,
            connect_timeout: Duration::from_secs(env_or("REDIS_CONNECTION_TIMEOUT", 5u64)?),
        })
    }

    /// Connection URL, with credentials percent-encoded.
    pub fn url(&self) -> String {
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!(
                "{}:{}@",
                urlencoding::encode(user),
                urlencoding::encode(pass)
            ),
            (Some(user), None) => format!("{}@", urlencoding::encode(user)),
            (None, Some(pass)) => format!(":{}@", urlencoding::encode(pass)),
            (None, None) => String::new(),
        };
        format!("redis://{}{}/{}", auth, self.address, self.db)
    }
}

/// Redis connection pool shared by every store in the process.
///
/// Built once at startup and handed to the stores that need it.
#[derive(Clone)]
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    pub async fn connect(settings: &RedisSettings) -> Result<Self> {
        let info = settings
            .url()
            .into_connection_info()
            .context("failed to parse Redis connection settings")?;

        let client = Client::open(info).context("failed to construct Redis client")?;

        let connection_manager = timeout(settings.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                anyhow!(
                    "timed out after {:?} connecting to Redis at {}",
                    settings.connect_timeout,
                    settings.address
                )
            })?
            .context("failed to initialize Redis connection manager")?;

        info!(address = %settings.address, db = settings.db, "Redis connection established");

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    /// Connect with a full `redis://` URL, used by tests pointing at `REDIS_URL`.
    pub async fn connect_url(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("failed to parse REDIS_URL connection string")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;
        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}
