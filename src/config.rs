//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::cluster::credentials::{DEFAULT_CA_PATH, DEFAULT_KUBECONFIG_PATH};
use crate::fleet::DEFAULT_METADATA_ADDRESS;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::watch::{ResourceKindRegistry, DEFAULT_WATCH_KINDS};
use crate::{Error, Result};

pub const DEFAULT_HEALTH_CHECK_PORT: u16 = 10240;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent
    Run(Box<AgentConfig>),
    /// Show version information
    Version,
    /// List the resource kinds that can be watched
    Kinds,
}

#[derive(Args, Debug, Clone)]
pub struct AgentConfig {
    /// Cluster API server URL, overriding the kubeconfig or in-cluster value
    #[arg(long, env = "KUBERNETES_URL")]
    pub kubernetes_url: Option<String>,

    /// Kubeconfig file, used when it exists
    #[arg(long, env = "KUBECONFIG_PATH", default_value = DEFAULT_KUBECONFIG_PATH)]
    pub kubeconfig: PathBuf,

    /// CA bundle for the cluster API server, used when it exists
    #[arg(long, env = "KUBERNETES_CA_FILE", default_value = DEFAULT_CA_PATH)]
    pub ca_file: PathBuf,

    /// File holding the bearer token for the cluster API
    #[arg(long, env = "KUBERNETES_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Read the bearer token from stdin
    #[arg(long, conflicts_with = "token_file")]
    pub token_stdin: bool,

    /// Fleet platform API URL
    #[arg(long, env = "CATTLE_URL")]
    pub cattle_url: Option<String>,

    #[arg(long, env = "CATTLE_ACCESS_KEY")]
    pub cattle_access_key: Option<String>,

    #[arg(long, env = "CATTLE_SECRET_KEY", hide_env_values = true)]
    pub cattle_secret_key: Option<String>,

    /// Address of the fleet metadata service
    #[arg(long, env = "RANCHER_METADATA_ADDRESS", default_value = DEFAULT_METADATA_ADDRESS)]
    pub metadata_address: String,

    /// Resource kinds forwarded as generic change events
    #[arg(
        long = "watch-kind",
        value_delimiter = ',',
        default_values_t = DEFAULT_WATCH_KINDS.iter().map(|k| k.to_string()).collect::<Vec<_>>()
    )]
    pub watch_kinds: Vec<String>,

    /// Seconds between host lifecycle syncs
    #[arg(long, env = "HOST_SYNC_INTERVAL", default_value_t = 5)]
    pub host_sync_interval: u64,

    /// Seconds a node drain may run
    #[arg(long, env = "DRAIN_TIMEOUT", default_value_t = 120)]
    pub drain_timeout: u64,

    /// Command used for draining, optionally with leading arguments
    #[arg(long, env = "KUBECTL", default_value = "kubectl")]
    pub kubectl: String,

    /// Total attempts for a node schedule update
    #[arg(long, env = "NODE_UPDATE_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub node_update_attempts: u32,

    #[arg(long, env = "HEALTH_CHECK_PORT", default_value_t = DEFAULT_HEALTH_CHECK_PORT)]
    pub health_check_port: u16,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl AgentConfig {
    /// Check the settings before anything connects
    pub fn validate(&self) -> Result<()> {
        match self.cattle_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {}
            _ => {
                return Err(Error::ConfigError(
                    "--cattle-url (CATTLE_URL) is required".to_string(),
                ))
            }
        }
        if self.host_sync_interval == 0 {
            return Err(Error::ConfigError(
                "--host-sync-interval must be at least 1 second".to_string(),
            ));
        }
        if self.drain_timeout == 0 {
            return Err(Error::ConfigError(
                "--drain-timeout must be at least 1 second".to_string(),
            ));
        }
        if self.node_update_attempts == 0 {
            return Err(Error::ConfigError(
                "--node-update-attempts must be at least 1".to_string(),
            ));
        }
        if self.kubectl.trim().is_empty() {
            return Err(Error::ConfigError("--kubectl must not be empty".to_string()));
        }

        ResourceKindRegistry::with_defaults().resolve(self.watch_kinds.as_slice())?;
        Ok(())
    }

    pub fn host_sync_interval(&self) -> Duration {
        Duration::from_secs(self.host_sync_interval)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.node_update_attempts)
    }
}
