//! Store client abstraction.
//!
//! Components take a [`StoreClient`] handle instead of a concrete connection;
//! [`RedisStore`] is the production implementation.
//!
//! - [`redis_store`]: `StoreClient` over a multiplexed `redis` connection
//! - [`scan`]: cursor-based key iteration on top of [`StoreClient::scan`]

pub mod redis_store;
pub mod scan;

pub use redis_store::RedisStore;
pub use scan::{scan_all, KeyScan};

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::IndexSchema;

/// Cursor value that starts a scan and signals its exhaustion.
pub const SCAN_START: u64 = 0;

/// Operations the migration needs from a search-enabled key-value store.
///
/// All failures surface as [`crate::MigrateError::Store`], except
/// [`create_index`](StoreClient::create_index) which reports server-side
/// rejections as [`crate::MigrateError::Create`].
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Connection URL handed to external tools (may contain credentials).
    fn url(&self) -> &str;

    /// List the names of all search indexes.
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Raw index-info reply for an index.
    async fn index_info(&self, name: &str) -> Result<redis::Value>;

    /// One step of a cursor scan: returns the next cursor and a batch of keys.
    ///
    /// A returned cursor of [`SCAN_START`] means the iteration is complete.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// Delete keys, returning how many existed.
    async fn delete_keys(&self, keys: &[String]) -> Result<u64>;

    /// Store-side type of a key (`hash`, `string`, `none`, ...).
    async fn key_type(&self, key: &str) -> Result<String>;

    /// Create an index. With `overwrite`, an existing index of the same name
    /// is dropped first (its documents are kept).
    async fn create_index(&self, schema: &IndexSchema, overwrite: bool) -> Result<()>;

    /// Drop an index, keeping its documents.
    ///
    /// Returns `false` when no such index existed.
    async fn drop_index(&self, name: &str) -> Result<bool>;

    /// Round-trip check.
    async fn ping(&self) -> Result<()>;
}
