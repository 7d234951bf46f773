//! External node drain procedure

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Extra time given to the process on top of its own `--timeout`
const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Evicts workloads from a node
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DrainCommand: Send + Sync {
    async fn drain(&self, hostname: &str) -> Result<()>;
}

/// Drains nodes with `kubectl drain`
#[derive(Clone, Debug)]
pub struct KubectlDrain {
    /// Program followed by any leading arguments
    command: Vec<String>,
    timeout: Duration,
    grace: Duration,
}

impl KubectlDrain {
    pub fn new(command: Vec<String>, timeout: Duration) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::ConfigError("Drain command is empty".to_string()));
        }
        Ok(Self {
            command,
            timeout,
            grace: DEFAULT_GRACE,
        })
    }

    /// Parse a whitespace separated command line such as `kubectl --context prod`
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Result<Self> {
        Self::new(
            command_line.split_whitespace().map(String::from).collect(),
            timeout,
        )
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Arguments passed after the configured command
    pub fn drain_args(&self, hostname: &str) -> Vec<String> {
        // kubectl treats a zero timeout as "wait forever"
        let timeout_secs = self.timeout.as_secs().max(1);
        vec![
            "drain".to_string(),
            hostname.to_string(),
            "--ignore-daemonsets".to_string(),
            "--force".to_string(),
            "--delete-local-data".to_string(),
            "--timeout".to_string(),
            format!("{timeout_secs}s"),
        ]
    }
}

#[async_trait]
impl DrainCommand for KubectlDrain {
    async fn drain(&self, hostname: &str) -> Result<()> {
        let (program, leading) = self
            .command
            .split_first()
            .ok_or_else(|| Error::ConfigError("Drain command is empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(leading)
            .args(self.drain_args(hostname))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(hostname, "Draining node");

        let bound = self.timeout + self.grace;
        let output = match tokio::time::timeout(bound, cmd.output()).await {
            Ok(output) => output.map_err(|e| Error::DrainFailed {
                hostname: hostname.to_string(),
                reason: format!("failed to run {program}: {e}"),
            })?,
            Err(_) => {
                return Err(Error::DrainTimeout {
                    hostname: hostname.to_string(),
                    timeout: bound,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(Error::DrainFailed {
                hostname: hostname.to_string(),
                reason,
            });
        }

        debug!(
            hostname,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "Drain finished"
        );
        Ok(())
    }
}
