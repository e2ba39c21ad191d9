//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source deployment (where the live index is read from).
    pub source: EndpointConfig,

    /// Target deployment (where the index is recreated).
    pub target: EndpointConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Replication utility configuration.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Inventory comparison configuration.
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Connection settings for one Redis deployment.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Hostname or IP address.
    pub host: String,

    /// Port (default: 6379).
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// ACL username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Logical database number (default: 0).
    #[serde(default)]
    pub database: u16,

    /// Use TLS (`rediss://`).
    #[serde(default)]
    pub tls: bool,

    /// Per-command deadline in milliseconds. Expiry is reported as a store error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("tls", &self.tls)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Index to migrate. Can be overridden on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// SCAN COUNT hint used while clearing the target prefix (default: 100).
    #[serde(default = "default_cleanup_scan_count")]
    pub cleanup_scan_count: usize,

    /// Reject vector fields that carry no dimension instead of assuming 3.
    #[serde(default)]
    pub strict_vector_dims: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            index_name: None,
            cleanup_scan_count: default_cleanup_scan_count(),
            strict_vector_dims: false,
        }
    }
}

/// External replication utility configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Executable to launch (default: "riotx").
    #[serde(default = "default_replication_binary")]
    pub binary: String,

    /// Replicate data structures instead of dump/restore (default: true).
    #[serde(default = "default_true")]
    pub struct_aware: bool,

    /// Worker threads inside the utility (default: 4).
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Keys per batch (default: 500).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Progress style passed through to the utility (default: "log").
    #[serde(default = "default_progress")]
    pub progress: String,

    /// Additional arguments appended verbatim after the standard ones.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            binary: default_replication_binary(),
            struct_aware: true,
            threads: default_threads(),
            batch_size: default_batch_size(),
            progress: default_progress(),
            extra_args: Vec::new(),
        }
    }
}

/// Inventory comparison configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Key pattern used by `compare-keys` (default: "*").
    #[serde(default = "default_key_pattern")]
    pub key_pattern: String,

    /// SCAN COUNT hint used while collecting key inventories (default: 1000).
    #[serde(default = "default_verify_scan_count")]
    pub scan_count: usize,

    /// Number of only-in-source keys annotated in debug reports (default: 10).
    #[serde(default = "default_debug_sample")]
    pub debug_sample: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            key_pattern: default_key_pattern(),
            scan_count: default_verify_scan_count(),
            debug_sample: default_debug_sample(),
        }
    }
}

// Default value functions for serde
fn default_redis_port() -> u16 {
    6379
}

fn default_cleanup_scan_count() -> usize {
    100
}

fn default_replication_binary() -> String {
    "riotx".to_string()
}

fn default_threads() -> usize {
    4
}

fn default_batch_size() -> usize {
    500
}

fn default_progress() -> String {
    "log".to_string()
}

fn default_key_pattern() -> String {
    "*".to_string()
}

fn default_verify_scan_count() -> usize {
    1000
}

fn default_debug_sample() -> usize {
    10
}

fn default_true() -> bool {
    true
}
