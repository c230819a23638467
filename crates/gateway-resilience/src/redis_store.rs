//! Redis-backed script store.
//!
//! Scripts are registered with `SCRIPT LOAD` and invoked with `EVALSHA`.
//! `redis::Script::invoke_async` is deliberately not used: it re-sends the
//! source on `NOSCRIPT`, and a flushed script must surface as an error here.

use crate::store::{ScriptStore, ScriptStoreError, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

impl From<RedisError> for ScriptStoreError {
    fn from(err: RedisError) -> Self {
        if err.kind() == ErrorKind::NoScriptError {
            Self::NoScript(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

/// Script store over a shared Redis instance.
///
/// The connection is opened on first use and then reused; the connection
/// manager reconnects on its own after a dropped link.
pub struct RedisScriptStore {
    client: Client,
    url: String,
    connection: OnceCell<ConnectionManager>,
}

impl RedisScriptStore {
    /// Create a store for the given Redis URL without connecting yet
    ///
    /// # Errors
    /// Returns error if the URL cannot be parsed
    pub fn new(url: impl Into<String>) -> StoreResult<Self> {
        let url = url.into();
        let client = Client::open(url.as_str())
            .map_err(|e| ScriptStoreError::Connection(format!("Invalid Redis URL: {e}")))?;

        info!(url = %url, "Initializing Redis script store");

        Ok(Self {
            client,
            url,
            connection: OnceCell::new(),
        })
    }

    /// Redis URL this store talks to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone()).await?;
                info!(url = %self.url, "Redis script store connected");
                Ok::<_, RedisError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Ping the store
    ///
    /// # Errors
    /// Returns error if Redis is unreachable
    pub async fn health_check(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl ScriptStore for RedisScriptStore {
    async fn script_load(&self, source: &str) -> StoreResult<String> {
        let mut conn = self.connection().await?;
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(source)
            .query_async(&mut conn)
            .await?;

        debug!(sha = %sha, "Script registered in Redis");
        Ok(sha)
    }

    async fn eval_sha(&self, sha: &str, keys: &[&str], args: &[i64]) -> StoreResult<i64> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("EVALSHA");
        cmd.arg(sha).arg(keys.len()).arg(keys).arg(args);

        Ok(cmd.query_async(&mut conn).await?)
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}
