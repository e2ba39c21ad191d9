//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.host.is_empty() {
        return Err(MigrateError::Config("source.host is required".into()));
    }
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }

    // Cannot migrate onto the same deployment
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.database == config.target.database
    {
        return Err(MigrateError::Config(
            "source and target cannot be the same deployment".into(),
        ));
    }

    if let Some(ref name) = config.migration.index_name {
        if name.trim().is_empty() {
            return Err(MigrateError::Config(
                "migration.index_name must not be empty".into(),
            ));
        }
    }
    if config.migration.cleanup_scan_count == 0 {
        return Err(MigrateError::Config(
            "migration.cleanup_scan_count must be at least 1".into(),
        ));
    }

    if config.replication.binary.trim().is_empty() {
        return Err(MigrateError::Config(
            "replication.binary is required".into(),
        ));
    }
    if config.replication.threads == 0 {
        return Err(MigrateError::Config(
            "replication.threads must be at least 1".into(),
        ));
    }
    if config.replication.batch_size == 0 {
        return Err(MigrateError::Config(
            "replication.batch_size must be at least 1".into(),
        ));
    }

    if config.verify.key_pattern.is_empty() {
        return Err(MigrateError::Config(
            "verify.key_pattern must not be empty".into(),
        ));
    }
    if config.verify.scan_count == 0 {
        return Err(MigrateError::Config(
            "verify.scan_count must be at least 1".into(),
        ));
    }

    Ok(())
}
