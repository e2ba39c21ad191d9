//! Error types for the migration library.

use thiserror::Error;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for store connectivity/protocol errors.
pub const EXIT_STORE_ERROR: u8 = 2;
/// Process exit code for malformed or incomplete index definitions.
pub const EXIT_SCHEMA_ERROR: u8 = 3;
/// Process exit code when the target rejects the new index.
pub const EXIT_CREATE_ERROR: u8 = 4;
/// Process exit code when the replication utility fails.
pub const EXIT_REPLICATION_ERROR: u8 = 5;
/// Process exit code when post-migration verification finds missing keys.
pub const EXIT_VERIFICATION_ERROR: u8 = 6;
/// Process exit code for file IO errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store connection, protocol or timeout error
    #[error("Store error: {0}")]
    Store(String),

    /// Index definition is malformed or incomplete
    #[error("Schema error for index {index}: {message}")]
    Schema { index: String, message: String },

    /// Target rejected the index definition
    #[error("Failed to create index {index} on target: {message}")]
    Create { index: String, message: String },

    /// Replication utility exited unsuccessfully
    #[error("Replication failed ({}): {stderr}", describe_exit(.exit_code))]
    Replication {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Post-migration key verification found differences
    #[error("Verification failed: {0}")]
    Verification(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<redis::RedisError> for MigrateError {
    fn from(err: redis::RedisError) -> Self {
        MigrateError::Store(err.to_string())
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

impl MigrateError {
    /// Create a Schema error for an index.
    pub fn schema(index: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Schema {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create a Create error for an index.
    pub fn create(index: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Create {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Store(_) => EXIT_STORE_ERROR,
            MigrateError::Schema { .. } => EXIT_SCHEMA_ERROR,
            MigrateError::Create { .. } => EXIT_CREATE_ERROR,
            MigrateError::Replication { .. } => EXIT_REPLICATION_ERROR,
            MigrateError::Verification(_) => EXIT_VERIFICATION_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
