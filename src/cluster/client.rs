//! Cluster client construction

use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use super::credentials::Credentials;
use crate::error::{Error, Result};

/// Connect to the cluster API.
///
/// A kubeconfig file wins when it exists. Otherwise an explicit URL is
/// combined with `credentials`, and without either the in-cluster or user
/// configuration is inferred.
pub async fn connect(
    kubernetes_url: Option<&str>,
    kubeconfig_path: Option<&Path>,
    credentials: &Credentials,
) -> Result<Client> {
    let options = KubeConfigOptions::default();

    let mut config = match (kubeconfig_path.filter(|p| p.exists()), kubernetes_url) {
        (Some(path), _) => {
            info!("Loading cluster configuration from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        (None, Some(url)) => {
            info!("Using explicit cluster URL {}", url);
            let kubeconfig = credentials.to_kubeconfig(url)?;
            Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        (None, None) => Config::infer()
            .await
            .map_err(|e| Error::ConfigError(format!("Failed to infer cluster config: {e}")))?,
    };

    if let Some(url) = kubernetes_url {
        config.cluster_url = url
            .parse()
            .map_err(|e| Error::ConfigError(format!("Invalid cluster URL {url}: {e}")))?;
    }

    Ok(Client::try_from(config)?)
}
