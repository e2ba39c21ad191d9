//! Migration orchestrator - main workflow coordinator.
//!
//! A run is four sequential phases, each awaited before the next starts:
//!
//! 1. Introspect the index on the source
//! 2. Prepare the target (drop index, clear prefix)
//! 3. Create the translated index on the target
//! 4. Replicate every key under the prefix
//!
//! The first failure ends the run. Nothing is rolled back: a failed
//! replication leaves the freshly created, empty index on the target, and
//! re-running the migration is the recovery path.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{redact_url, Config};
use crate::error::{MigrateError, Result};
use crate::replicate::{replication_args, ProcessReplicator, Replicator};
use crate::schema::{create_on_target, translate, IndexDefinition, IndexSchema, Introspector};
use crate::store::{RedisStore, StoreClient};
use crate::target::{prepare, PrepareReport};
use crate::verify::{self, InventoryComparison};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn StoreClient>,
    target: Arc<dyn StoreClient>,
    replicator: Arc<dyn Replicator>,
}

/// Phase of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStep {
    Introspect,
    Prepare,
    Create,
    Replicate,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStep::Introspect => "introspect",
            MigrationStep::Prepare => "prepare",
            MigrationStep::Create => "create",
            MigrationStep::Replicate => "replicate",
        };
        f.write_str(name)
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    /// Unique run identifier.
    pub run_id: String,

    /// Migrated index.
    pub index_name: String,

    /// Whether every phase completed.
    pub success: bool,

    /// Prefix of the migrated index, once introspection succeeded.
    pub prefix: Option<String>,

    /// What target preparation removed.
    pub prepare: Option<PrepareReport>,

    /// Error message of the failed phase.
    pub error: Option<String>,

    /// Phase that failed.
    pub failed_step: Option<MigrationStep>,

    /// Process exit code for this outcome (0 on success).
    pub exit_code: u8,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl MigrationOutcome {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What a migration would do, computed without touching the target.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub index_name: String,
    pub prefix: String,
    pub key_pattern: String,
    pub schema: IndexSchema,
    /// Replication command line with passwords redacted.
    pub replication_command: Vec<String>,
}

impl MigrationPlan {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Connectivity of both deployments.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

#[derive(Default)]
struct RunProgress {
    step: Option<MigrationStep>,
    prefix: Option<String>,
    prepare: Option<PrepareReport>,
}

impl Orchestrator {
    /// Connect to both deployments and use the configured replication utility.
    pub async fn new(config: Config) -> Result<Self> {
        let source = RedisStore::connect(&config.source).await?;
        let target = RedisStore::connect(&config.target).await?;
        let replicator = ProcessReplicator::from_config(&config.replication);

        Ok(Self::with_components(
            config,
            Arc::new(source),
            Arc::new(target),
            Arc::new(replicator),
        ))
    }

    /// Build an orchestrator from already constructed collaborators.
    pub fn with_components(
        config: Config,
        source: Arc<dyn StoreClient>,
        target: Arc<dyn StoreClient>,
        replicator: Arc<dyn Replicator>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            replicator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn StoreClient {
        self.source.as_ref()
    }

    pub fn target(&self) -> &dyn StoreClient {
        self.target.as_ref()
    }

    /// Index to migrate: the explicit name, else `migration.index_name`.
    pub fn resolve_index_name(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.config.migration.index_name.clone())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                MigrateError::Config(
                    "no index to migrate: pass --index or set migration.index_name".to_string(),
                )
            })
    }

    fn introspector(&self) -> Introspector {
        Introspector::new().strict_vector_dims(self.config.migration.strict_vector_dims)
    }

    async fn load_definition(&self, index_name: &str) -> Result<IndexDefinition> {
        let info = self.source.index_info(index_name).await?;
        let def = self.introspector().introspect(index_name, &info)?;

        info!(
            "Index {} covers prefix {} with {} fields",
            def.name,
            def.prefix,
            def.fields.len()
        );
        for (field, attrs) in def.vector_fields() {
            info!(
                "  vector field {}: {} dim={} metric={} type={}",
                field.name, attrs.algorithm, attrs.dims, attrs.distance_metric, attrs.data_type
            );
        }
        Ok(def)
    }

    /// Introspect and translate without touching the target.
    pub async fn plan(&self, index_name: &str) -> Result<MigrationPlan> {
        let def = self.load_definition(index_name).await?;
        let key_pattern = def.key_pattern();
        let replication_command = std::iter::once(self.config.replication.binary.clone())
            .chain(replication_args(
                &redact_url(self.source.url()),
                &redact_url(self.target.url()),
                &key_pattern,
                &self.config.replication.options(),
            ))
            .chain(self.config.replication.extra_args.iter().cloned())
            .collect();

        Ok(MigrationPlan {
            index_name: def.name.clone(),
            prefix: def.prefix.clone(),
            key_pattern,
            schema: translate(&def),
            replication_command,
        })
    }

    /// Run the migration of `index_name`.
    ///
    /// Never panics or returns early on failure; the outcome records which
    /// phase failed and why.
    pub async fn migrate(&self, index_name: &str) -> MigrationOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("Starting migration run {} for index {}", run_id, index_name);

        let mut progress = RunProgress::default();
        let result = self.run_phases(index_name, &mut progress).await;

        let duration_seconds = start.elapsed().as_secs_f64();
        let (error, failed_step, exit_code) = match result {
            Ok(()) => {
                info!(
                    "Migration of {} completed in {:.1}s",
                    index_name, duration_seconds
                );
                (None, None, 0)
            }
            Err(e) => {
                let step = progress.step.unwrap_or(MigrationStep::Introspect);
                error!("Migration of {} failed during {}: {}", index_name, step, e);
                if step == MigrationStep::Replicate {
                    warn!(
                        "Target index {} exists but holds no replicated data; re-run the migration",
                        index_name
                    );
                }
                (Some(e.to_string()), Some(step), e.exit_code())
            }
        };

        MigrationOutcome {
            run_id,
            index_name: index_name.to_string(),
            success: error.is_none(),
            prefix: progress.prefix,
            prepare: progress.prepare,
            error,
            failed_step,
            exit_code,
            started_at,
            completed_at: Utc::now(),
            duration_seconds,
        }
    }

    async fn run_phases(&self, index_name: &str, progress: &mut RunProgress) -> Result<()> {
        progress.step = Some(MigrationStep::Introspect);
        info!("Phase 1: Introspecting {} on source", index_name);
        let def = self.load_definition(index_name).await?;
        progress.prefix = Some(def.prefix.clone());

        progress.step = Some(MigrationStep::Prepare);
        info!("Phase 2: Preparing target");
        let report = prepare(
            self.target.as_ref(),
            index_name,
            &def.prefix,
            self.config.migration.cleanup_scan_count,
        )
        .await?;
        progress.prepare = Some(report);

        progress.step = Some(MigrationStep::Create);
        info!("Phase 3: Creating index on target");
        let prefix = create_on_target(self.target.as_ref(), &def).await?;

        progress.step = Some(MigrationStep::Replicate);
        info!("Phase 4: Replicating keys matching {}*", prefix);
        let report = self
            .replicator
            .replicate(
                self.source.url(),
                self.target.url(),
                &format!("{}*", prefix),
                &self.config.replication.options(),
            )
            .await?;
        info!(
            "Replication of {}* took {:.1}s",
            prefix,
            report.duration.as_secs_f64()
        );

        Ok(())
    }

    /// Compare keys under `prefix` on both deployments.
    ///
    /// Fails with a store error when either side could not be scanned, and
    /// with a verification error when the key sets differ.
    pub async fn verify_prefix(&self, prefix: &str) -> Result<InventoryComparison> {
        let pattern = format!("{}*", prefix);
        info!("Verifying keys matching {}", pattern);
        let comparison = verify::compare_key_sets(
            self.source.as_ref(),
            self.target.as_ref(),
            &pattern,
            self.config.verify.scan_count,
        )
        .await;

        for inventory in [&comparison.source, &comparison.target] {
            if let Some(ref e) = inventory.error {
                return Err(MigrateError::Store(format!(
                    "verification scan of {} failed: {}",
                    inventory.origin, e
                )));
            }
        }

        let result = &comparison.result;
        if !result.is_match() {
            return Err(MigrateError::Verification(format!(
                "{} keys matching {} missing on target, {} unexpected on target",
                result.only_in_source.len(),
                pattern,
                result.only_in_target.len()
            )));
        }

        info!(
            "Verified {} keys matching {} on both deployments",
            result.in_both.len(),
            pattern
        );
        Ok(comparison)
    }

    /// Ping both deployments.
    pub async fn health_check(&self) -> HealthCheckResult {
        let (source_latency_ms, source_error) = ping(self.source.as_ref()).await;
        let (target_latency_ms, target_error) = ping(self.target.as_ref()).await;

        let source_connected = source_error.is_none();
        let target_connected = target_error.is_none();

        HealthCheckResult {
            source_connected,
            source_latency_ms,
            source_error,
            target_connected,
            target_latency_ms,
            target_error,
            healthy: source_connected && target_connected,
        }
    }
}

async fn ping(store: &dyn StoreClient) -> (u64, Option<String>) {
    let start = Instant::now();
    let result = store.ping().await;
    let latency = start.elapsed().as_millis() as u64;
    (latency, result.err().map(|e| e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, ReplicationConfig};
    use crate::replicate::{ReplicationOptions, ReplicationReport};
    use crate::testing::{ft_info_reply, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replicator that copies keys between two memory stores, or fails with
    /// a fixed exit code.
    struct FakeReplicator {
        source: Arc<MemoryStore>,
        target: Arc<MemoryStore>,
        exit_code: Option<i32>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeReplicator {
        fn new(source: &Arc<MemoryStore>, target: &Arc<MemoryStore>) -> Self {
            Self {
                source: Arc::clone(source),
                target: Arc::clone(target),
                exit_code: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn exiting_with(mut self, code: i32) -> Self {
            self.exit_code = Some(code);
            self
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Replicator for FakeReplicator {
        async fn replicate(
            &self,
            source_url: &str,
            target_url: &str,
            key_pattern: &str,
            _options: &ReplicationOptions,
        ) -> Result<ReplicationReport> {
            self.calls.lock().unwrap().push((
                source_url.to_string(),
                target_url.to_string(),
                key_pattern.to_string(),
            ));
            if let Some(code) = self.exit_code {
                return Err(MigrateError::Replication {
                    exit_code: Some(code),
                    stderr: "ERROR: connection refused".into(),
                });
            }
            for key in self.source.keys() {
                if crate::testing::glob_match(key_pattern, &key) {
                    self.target.insert_key(key);
                }
            }
            Ok(ReplicationReport {
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::from_millis(5),
            })
        }
    }

    fn endpoint(port: u16) -> EndpointConfig {
        EndpointConfig {
            host: "localhost".into(),
            port,
            username: None,
            password: None,
            database: 0,
            tls: false,
            timeout_ms: None,
        }
    }

    fn test_config() -> Config {
        Config {
            source: endpoint(17120),
            target: endpoint(12416),
            migration: Default::default(),
            replication: ReplicationConfig::default(),
            verify: Default::default(),
        }
    }

    fn doc_source() -> Arc<MemoryStore> {
        let source = MemoryStore::new()
            .with_url("redis://localhost:17120")
            .with_keys((0..20).map(|i| format!("doc:{}", i)))
            .with_keys(["user:1"]);
        source.add_index(
            "docIdx",
            ft_info_reply(
                "doc:",
                vec![
                    vec![
                        "identifier", "embedding", "attribute", "embedding", "type", "VECTOR",
                        "algorithm", "FLAT", "dim", "4", "distance_metric", "COSINE",
                        "data_type", "FLOAT32",
                    ],
                    vec!["identifier", "title", "attribute", "title", "type", "TEXT"],
                ],
            ),
        );
        Arc::new(source)
    }

    fn stale_target() -> Arc<MemoryStore> {
        let target = MemoryStore::new()
            .with_url("redis://localhost:12416")
            .with_keys(["doc:stale", "other:1"]);
        target.add_index("docIdx", ft_info_reply("doc:", vec![vec!["attribute", "x", "type", "TEXT"]]));
        Arc::new(target)
    }

    fn orchestrator(
        source: &Arc<MemoryStore>,
        target: &Arc<MemoryStore>,
        replicator: Arc<FakeReplicator>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            test_config(),
            source.clone(),
            target.clone(),
            replicator,
        )
    }

    #[tokio::test]
    async fn test_migrate_success() {
        let source = doc_source();
        let target = stale_target();
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator.clone());

        let outcome = orch.migrate("docIdx").await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.prefix.as_deref(), Some("doc:"));
        assert_eq!(outcome.prepare.as_ref().map(|p| p.keys_deleted), Some(1));
        assert_eq!(
            replicator.calls(),
            vec![(
                "redis://localhost:17120".to_string(),
                "redis://localhost:12416".to_string(),
                "doc:*".to_string()
            )]
        );

        let schema = target.created_schema("docIdx").unwrap();
        assert_eq!(schema, orch.plan("docIdx").await.unwrap().schema);
        assert!(!target.keys().contains(&"doc:stale".to_string()));
        assert!(target.keys().contains(&"other:1".to_string()));

        let comparison = orch.verify_prefix("doc:").await.unwrap();
        assert_eq!(comparison.result.in_both.len(), 20);
    }

    #[tokio::test]
    async fn test_replication_failure_is_reported_not_continued() {
        let source = doc_source();
        let target = stale_target();
        let replicator = Arc::new(FakeReplicator::new(&source, &target).exiting_with(1));
        let orch = orchestrator(&source, &target, replicator.clone());

        let outcome = orch.migrate("docIdx").await;

        assert!(!outcome.success);
        assert_eq!(outcome.failed_step, Some(MigrationStep::Replicate));
        assert_eq!(outcome.exit_code, crate::error::EXIT_REPLICATION_ERROR);
        assert!(outcome.error.unwrap().contains("connection refused"));
        assert_eq!(replicator.calls().len(), 1);
        // The fresh index stays behind, empty.
        assert!(target.has_index("docIdx"));
        assert!(target.keys().iter().all(|k| !k.starts_with("doc:")));
        // Nothing after replication touched the stores.
        assert_eq!(source.calls(), vec!["FT.INFO docIdx".to_string()]);
    }

    #[tokio::test]
    async fn test_introspection_failure_leaves_target_untouched() {
        let source = Arc::new(MemoryStore::new());
        let target = stale_target();
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator.clone());

        let outcome = orch.migrate("missingIdx").await;

        assert!(!outcome.success);
        assert_eq!(outcome.failed_step, Some(MigrationStep::Introspect));
        assert_eq!(outcome.exit_code, crate::error::EXIT_STORE_ERROR);
        assert!(outcome.prefix.is_none());
        assert!(!target.was_mutated());
        assert!(replicator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejection_stops_before_replication() {
        let source = doc_source();
        let target = Arc::new(MemoryStore::new().rejecting_create("Bad arguments for vector field"));
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator.clone());

        let outcome = orch.migrate("docIdx").await;

        assert_eq!(outcome.failed_step, Some(MigrationStep::Create));
        assert_eq!(outcome.exit_code, crate::error::EXIT_CREATE_ERROR);
        assert!(replicator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_plan_does_not_touch_target() {
        let source = doc_source();
        let target = stale_target();
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator.clone());

        let plan = orch.plan("docIdx").await.unwrap();

        assert_eq!(plan.key_pattern, "doc:*");
        assert_eq!(plan.schema.fields.len(), 2);
        assert_eq!(plan.replication_command[0], "riotx");
        assert_eq!(plan.replication_command[1], "replicate");
        assert!(plan.to_yaml().unwrap().contains("doc:*"));
        assert!(!target.was_mutated());
        assert!(replicator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_verify_prefix_reports_missing_keys() {
        let source = doc_source();
        let target = Arc::new(MemoryStore::new().with_keys(["doc:0", "doc:1"]));
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator);

        let err = orch.verify_prefix("doc:").await.unwrap_err();

        assert!(matches!(err, MigrateError::Verification(_)));
        assert!(err.to_string().contains("18 keys matching doc:* missing on target"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let source = doc_source();
        let target = Arc::new(MemoryStore::new().failing());
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let orch = orchestrator(&source, &target, replicator);

        let result = orch.health_check().await;

        assert!(result.source_connected);
        assert!(!result.target_connected);
        assert!(result.target_error.is_some());
        assert!(!result.healthy);
    }

    #[test]
    fn test_resolve_index_name() {
        let source = doc_source();
        let target = stale_target();
        let replicator = Arc::new(FakeReplicator::new(&source, &target));
        let mut orch = orchestrator(&source, &target, replicator);

        assert!(orch.resolve_index_name(None).is_err());
        assert_eq!(orch.resolve_index_name(Some("a")).unwrap(), "a");

        orch.config.migration.index_name = Some("docIdx".into());
        assert_eq!(orch.resolve_index_name(None).unwrap(), "docIdx");
        assert_eq!(orch.resolve_index_name(Some("other")).unwrap(), "other");
    }

    #[test]
    fn test_outcome_json() {
        let now = Utc::now();
        let outcome = MigrationOutcome {
            run_id: "r".into(),
            index_name: "docIdx".into(),
            success: false,
            prefix: Some("doc:".into()),
            prepare: None,
            error: Some("boom".into()),
            failed_step: Some(MigrationStep::Replicate),
            exit_code: 5,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.5,
        };

        let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();

        assert_eq!(json["failed_step"], "replicate");
        assert_eq!(json["exit_code"], 5);
        assert_eq!(json["success"], false);
    }
}
