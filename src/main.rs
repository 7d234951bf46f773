use std::sync::Arc;

use clap::Parser;
use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::api::{Api, DynamicObject};
use tracing::{error, info, warn};

use fleet_agent::cluster::{
    self, Credentials, KubeNamespaceLookup, KubeNodeClient, KubectlDrain,
};
use fleet_agent::config::{AgentConfig, Cli, Commands};
use fleet_agent::controller::{HostLifecycleSynchronizer, NodeScheduleReconciler};
use fleet_agent::fleet::{FleetClient, MetadataClient, Publisher};
use fleet_agent::watch::{
    Forwarder, GenericTranslator, NamespaceTranslator, ResourceKindRegistry, ResourceWatcher,
    ServiceTranslator, WatchHandle,
};
use fleet_agent::{telemetry, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("fleet-agent v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Kinds => {
            for name in ResourceKindRegistry::with_defaults().names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Run(config) => {
            telemetry::init_telemetry(config.log_json)?;
            let result = run_agent(*config).await;
            if let Err(e) = &result {
                error!("Agent stopped: {}", e);
            }
            telemetry::shutdown_telemetry();
            result
        }
    }
}

async fn run_agent(config: AgentConfig) -> Result<(), Error> {
    config.validate()?;
    info!("Starting fleet-agent v{}", env!("CARGO_PKG_VERSION"));

    let credentials = Credentials::load(
        config.token_file.as_deref(),
        config.token_stdin,
        Some(config.ca_file.as_path()),
    )?;
    let client = cluster::connect(
        config.kubernetes_url.as_deref(),
        Some(config.kubeconfig.as_path()),
        &credentials,
    )
    .await?;
    info!("Connected to Kubernetes cluster");

    let cattle_url = config
        .cattle_url
        .clone()
        .ok_or_else(|| Error::ConfigError("--cattle-url is required".to_string()))?;
    let publisher: Arc<dyn Publisher> = Arc::new(FleetClient::new(
        &cattle_url,
        config.cattle_access_key.clone(),
        config.cattle_secret_key.clone(),
    )?);

    let watches = start_watches(&config, client.clone(), publisher)?;

    let reconciler = NodeScheduleReconciler::new(
        Arc::new(KubeNodeClient::new(client)),
        Arc::new(KubectlDrain::from_command_line(
            &config.kubectl,
            config.drain_timeout(),
        )?),
        config.retry_policy(),
    );
    let synchronizer = Arc::new(HostLifecycleSynchronizer::new(
        Arc::new(MetadataClient::new(&config.metadata_address)?),
        reconciler,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let sync_interval = config.host_sync_interval();
    let mut host_sync = tokio::spawn(async move {
        synchronizer
            .run(sync_interval, async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    #[cfg(feature = "rest-api")]
    let mut health = tokio::spawn(fleet_agent::rest_api::run_server(config.health_check_port));
    #[cfg(not(feature = "rest-api"))]
    let mut health = tokio::spawn(std::future::pending::<fleet_agent::Result<()>>());

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            signal.map_err(Error::from)
        }
        joined = &mut host_sync => {
            warn!("Host sync task ended");
            joined.map_err(|e| Error::ConfigError(format!("Host sync task failed: {e}")))
        }
        served = &mut health => {
            warn!("Health check listener ended");
            match served {
                Ok(result) => result,
                Err(e) => Err(Error::ConfigError(format!("Health check task failed: {e}"))),
            }
        }
        finished = wait_any(&watches) => {
            warn!("Watch for {} ended", finished);
            Ok(())
        }
    };

    let _ = shutdown_tx.send(());
    health.abort();
    for handle in watches {
        handle.stop().await;
    }
    if !host_sync.is_finished() {
        let _ = host_sync.await;
    }

    info!("fleet-agent stopped");
    result
}

/// Service and namespace watches plus one generic watch per configured kind
fn start_watches(
    config: &AgentConfig,
    client: kube::Client,
    publisher: Arc<dyn Publisher>,
) -> Result<Vec<WatchHandle>, Error> {
    let kinds = ResourceKindRegistry::with_defaults().resolve(config.watch_kinds.as_slice())?;
    let mut handles = Vec::with_capacity(kinds.len() + 2);

    let services = Forwarder::new(
        "services",
        ServiceTranslator::new(Arc::new(KubeNamespaceLookup::new(client.clone()))),
        publisher.clone(),
    );
    handles.push(ResourceWatcher::watch(
        "service-events",
        Api::<Service>::all(client.clone()),
        Arc::new(services),
    ));

    let namespaces = Forwarder::new("namespaces", NamespaceTranslator, publisher.clone());
    handles.push(ResourceWatcher::watch(
        "namespace-events",
        Api::<Namespace>::all(client.clone()),
        Arc::new(namespaces),
    ));

    for kind in kinds {
        let forwarder = Forwarder::new(
            kind.name.clone(),
            GenericTranslator::<DynamicObject>::new(),
            publisher.clone(),
        );
        handles.push(ResourceWatcher::watch(
            &kind.name,
            kind.api(client.clone(), None),
            Arc::new(forwarder),
        ));
    }

    info!("Started {} watches", handles.len());
    Ok(handles)
}

/// Resolves with the kind of the first watch whose task has ended
async fn wait_any(watches: &[WatchHandle]) -> String {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        ticker.tick().await;
        if let Some(handle) = watches.iter().find(|h| h.is_finished()) {
            return handle.kind().to_string();
        }
    }
}
