//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use crate::replicate::ReplicationOptions;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl EndpointConfig {
    /// Build a connection URL for the replication utility.
    ///
    /// Format: `redis[s]://[user][:password@]host:port/db`, with the user and
    /// password percent-encoded.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let mut url = format!("{}://", scheme);

        if let Some(ref user) = self.username {
            url.push_str(&urlencoding::encode(user));
        }
        if let Some(ref pass) = self.password {
            url.push(':');
            url.push_str(&urlencoding::encode(pass));
        }
        if self.username.is_some() || self.password.is_some() {
            url.push('@');
        }
        url.push_str(&format!("{}:{}", self.host, self.port));
        if self.database != 0 {
            url.push_str(&format!("/{}", self.database));
        }
        url
    }

    /// Connection parameters for the redis client, with credentials passed
    /// through as-is.
    pub fn connection_info(&self) -> ConnectionInfo {
        let addr = if self.tls {
            ConnectionAddr::TcpTls {
                host: self.host.clone(),
                port: self.port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(self.host.clone(), self.port)
        };

        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: i64::from(self.database),
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }

    /// `host:port` label for log lines and reports.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ReplicationConfig {
    /// Options handed to the replication utility.
    pub fn options(&self) -> ReplicationOptions {
        ReplicationOptions {
            struct_aware: self.struct_aware,
            threads: self.threads,
            batch_size: self.batch_size,
            progress: self.progress.clone(),
        }
    }
}

/// Replace the password in a connection URL so it can be logged.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let Some(at) = rest.rfind('@') else {
        return url.to_string();
    };
    let userinfo = &rest[..at];
    let user = userinfo.split(':').next().unwrap_or_default();
    if !userinfo.contains(':') {
        return url.to_string();
    }
    format!(
        "{}{}:[REDACTED]@{}",
        &url[..scheme_end + 3],
        user,
        &rest[at + 1..]
    )
}
