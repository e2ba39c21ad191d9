//! Bulk record copy through the external replication utility.
//!
//! The utility is a separate process with its own release cycle. Only its
//! exit status is interpreted; its output is captured and logged verbatim.

use std::io;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{redact_url, ReplicationConfig};
use crate::error::{MigrateError, Result};

/// Tuning passed to the replication utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationOptions {
    /// Copy data structures type by type (`--struct`).
    pub struct_aware: bool,
    /// Worker threads (must be positive).
    pub threads: usize,
    /// Keys per batch (must be positive).
    pub batch_size: usize,
    /// Progress display mode.
    pub progress: String,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        Self {
            struct_aware: true,
            threads: 4,
            batch_size: 500,
            progress: "log".to_string(),
        }
    }
}

/// Result of a successful replication run.
#[derive(Debug, Clone)]
pub struct ReplicationReport {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Build the argument vector for `<tool> replicate ...`.
pub fn replication_args(
    source_url: &str,
    target_url: &str,
    key_pattern: &str,
    options: &ReplicationOptions,
) -> Vec<String> {
    let mut args = vec![
        "replicate".to_string(),
        source_url.to_string(),
        target_url.to_string(),
        "--key-pattern".to_string(),
        key_pattern.to_string(),
    ];
    if options.struct_aware {
        args.push("--struct".to_string());
    }
    args.extend([
        "--threads".to_string(),
        options.threads.to_string(),
        "--batch".to_string(),
        options.batch_size.to_string(),
        "--progress".to_string(),
        options.progress.clone(),
    ]);
    args
}

/// Copies every key matching a pattern from one endpoint to another.
#[async_trait]
pub trait Replicator: Send + Sync {
    async fn replicate(
        &self,
        source_url: &str,
        target_url: &str,
        key_pattern: &str,
        options: &ReplicationOptions,
    ) -> Result<ReplicationReport>;
}

/// [`Replicator`] that runs the utility as a child process and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessReplicator {
    binary: String,
    extra_args: Vec<String>,
}

impl ProcessReplicator {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &ReplicationConfig) -> Self {
        Self::new(config.binary.clone()).with_extra_args(config.extra_args.clone())
    }

    /// Arguments appended after the standard ones.
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run the utility to completion, retrying the launch while the
    /// executable is still open for writing elsewhere.
    async fn run(&self, args: &[String]) -> io::Result<Output> {
        let mut attempt = 1;
        loop {
            let result = Command::new(&self.binary)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await;

            match result {
                Err(e) if is_text_file_busy(&e) && attempt < LAUNCH_ATTEMPTS => {
                    debug!(
                        "{} is busy, retrying launch ({}/{})",
                        self.binary, attempt, LAUNCH_ATTEMPTS
                    );
                    tokio::time::sleep(LAUNCH_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

const LAUNCH_ATTEMPTS: u32 = 5;
const LAUNCH_RETRY_DELAY: Duration = Duration::from_millis(20);

/// `ETXTBSY`: the executable is open for writing, typically by a process
/// that forked while the file was being written.
#[cfg(unix)]
fn is_text_file_busy(e: &io::Error) -> bool {
    const ETXTBSY: i32 = 26;
    e.raw_os_error() == Some(ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_file_busy(_e: &io::Error) -> bool {
    false
}

#[async_trait]
impl Replicator for ProcessReplicator {
    async fn replicate(
        &self,
        source_url: &str,
        target_url: &str,
        key_pattern: &str,
        options: &ReplicationOptions,
    ) -> Result<ReplicationReport> {
        let mut args = replication_args(source_url, target_url, key_pattern, options);
        args.extend(self.extra_args.iter().cloned());

        info!(
            "Running {} replicate {} -> {} (pattern {}, {} threads, batch {})",
            self.binary,
            redact_url(source_url),
            redact_url(target_url),
            key_pattern,
            options.threads,
            options.batch_size
        );

        let start = Instant::now();
        let output = self
            .run(&args)
            .await
            .map_err(|e| MigrateError::Replication {
                exit_code: None,
                stderr: format!("failed to launch {}: {}", self.binary, e),
            })?;
        let duration = start.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{}: {}", self.binary, line);
        }

        if !output.status.success() {
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                warn!("{}: {}", self.binary, line);
            }
            return Err(MigrateError::Replication {
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{} (stderr): {}", self.binary, line);
        }
        info!(
            "Replication finished in {:.1}s",
            duration.as_secs_f64()
        );

        Ok(ReplicationReport {
            stdout,
            stderr,
            duration,
        })
    }
}
