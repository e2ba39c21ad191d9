//! [`StoreClient`] backed by the `redis` crate.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, ErrorKind, FromRedisValue, RedisError, RedisResult, Value};
use tracing::debug;

use super::StoreClient;
use crate::config::EndpointConfig;
use crate::error::{MigrateError, Result};
use crate::schema::IndexSchema;

/// Redis deployment with the search module loaded, over a multiplexed async
/// connection.
pub struct RedisStore {
    url: String,
    address: String,
    connection: MultiplexedConnection,
    timeout: Option<Duration>,
}

impl RedisStore {
    /// Connect to the endpoint described by `endpoint`.
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self> {
        let url = endpoint.url();
        let address = endpoint.address();
        let timeout = endpoint.timeout_ms.map(Duration::from_millis);

        let client = redis::Client::open(endpoint.connection_info()).map_err(|e| {
            MigrateError::Store(format!("invalid connection settings for {}: {}", address, e))
        })?;

        let connect = client.get_multiplexed_async_connection();
        let connection = match timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                MigrateError::Store(format!(
                    "connecting to {} timed out after {}ms",
                    address,
                    limit.as_millis()
                ))
            })?,
            None => connect.await,
        }
        .map_err(|e| MigrateError::Store(format!("failed to connect to {}: {}", address, e)))?;

        debug!("Connected to {}", address);
        Ok(Self {
            url,
            address,
            connection,
            timeout,
        })
    }

    /// `host:port` of this deployment.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run a command under the configured deadline.
    ///
    /// The outer error is a timeout; the inner result is the server's answer.
    async fn query<T: FromRedisValue>(&self, op: &str, cmd: &Cmd) -> Result<RedisResult<T>> {
        let mut conn = self.connection.clone();
        let fut = cmd.query_async(&mut conn);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                MigrateError::Store(format!(
                    "{} on {} timed out after {}ms",
                    op,
                    self.address,
                    limit.as_millis()
                ))
            }),
            None => Ok(fut.await),
        }
    }

    fn store_error(&self, op: &str, err: RedisError) -> MigrateError {
        MigrateError::Store(format!("{} on {} failed: {}", op, self.address, err))
    }
}

// "-Unknown Index name" is parsed into code "Unknown" + detail "Index name",
// which displays as "Unknown: Index name".
fn is_unknown_index(err: &RedisError) -> bool {
    let msg = err.to_string().to_lowercase().replace(':', "");
    msg.contains("unknown index") || msg.contains("no such index")
}

fn is_server_rejection(err: &RedisError) -> bool {
    matches!(err.kind(), ErrorKind::ResponseError | ErrorKind::ExtensionError)
}

#[async_trait]
impl StoreClient for RedisStore {
    fn url(&self) -> &str {
        &self.url
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.query("FT._LIST", &redis::cmd("FT._LIST"))
            .await?
            .map_err(|e| self.store_error("FT._LIST", e))
    }

    async fn index_info(&self, name: &str) -> Result<Value> {
        let mut cmd = redis::cmd("FT.INFO");
        cmd.arg(name);
        self.query("FT.INFO", &cmd)
            .await?
            .map_err(|e| self.store_error("FT.INFO", e))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        self.query("SCAN", &cmd)
            .await?
            .map_err(|e| self.store_error("SCAN", e))
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        cmd.arg(keys);
        self.query("DEL", &cmd)
            .await?
            .map_err(|e| self.store_error("DEL", e))
    }

    async fn key_type(&self, key: &str) -> Result<String> {
        let mut cmd = redis::cmd("TYPE");
        cmd.arg(key);
        self.query("TYPE", &cmd)
            .await?
            .map_err(|e| self.store_error("TYPE", e))
    }

    async fn create_index(&self, schema: &IndexSchema, overwrite: bool) -> Result<()> {
        let name = &schema.index.name;
        if overwrite && self.drop_index(name).await? {
            debug!("Dropped existing index {} before re-creating it", name);
        }

        let mut cmd = redis::cmd("FT.CREATE");
        cmd.arg(schema.create_args());
        let reply: RedisResult<()> = self.query("FT.CREATE", &cmd).await?;
        reply.map_err(|e| {
            if is_server_rejection(&e) {
                MigrateError::create(name.as_str(), e.to_string())
            } else {
                self.store_error("FT.CREATE", e)
            }
        })
    }

    async fn drop_index(&self, name: &str) -> Result<bool> {
        let mut cmd = redis::cmd("FT.DROPINDEX");
        cmd.arg(name);
        let reply: RedisResult<()> = self.query("FT.DROPINDEX", &cmd).await?;
        match reply {
            Ok(()) => Ok(true),
            Err(e) if is_unknown_index(&e) => Ok(false),
            Err(e) => Err(self.store_error("FT.DROPINDEX", e)),
        }
    }

    async fn ping(&self) -> Result<()> {
        let _pong: String = self
            .query("PING", &redis::cmd("PING"))
            .await?
            .map_err(|e| self.store_error("PING", e))?;
        Ok(())
    }
}
