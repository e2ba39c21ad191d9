//! # redis-index-migrate
//!
//! Moves a search index and its documents from one Redis deployment to
//! another.
//!
//! The library provides:
//!
//! - **Schema introspection** of a live index into typed field descriptors
//! - **Index re-creation** on the target with the same fields and prefix
//! - **Target preparation** that clears the prefix before the copy
//! - **Bulk copy** delegated to the external `riotx` replication utility
//! - **Inventory comparison** of index names and key names across deployments
//!
//! ## Example
//!
//! ```rust,no_run
//! use redis_index_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> redis_index_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let outcome = orchestrator.migrate("docIdx").await;
//!     println!("success: {}", outcome.success);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod replicate;
pub mod schema;
pub mod store;
pub mod target;
pub mod verify;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, EndpointConfig, MigrationConfig, ReplicationConfig, VerifyConfig};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    HealthCheckResult, MigrationOutcome, MigrationPlan, MigrationStep, Orchestrator,
};
pub use replicate::{ProcessReplicator, ReplicationOptions, Replicator};
pub use schema::{IndexDefinition, IndexSchema};
pub use store::{RedisStore, StoreClient};
pub use target::PrepareReport;
pub use verify::{ComparisonResult, InventoryComparison, KeyComparisonReport};
