//! # Application Sync Controller
//!
//! Periodically reconciles runtime `Application` resources, their secrets and
//! documentation against a desired-state snapshot exported by the directory
//! service.
//!
//! Each pass reads the snapshot file, runs the reconciler once and logs the
//! results. Failures are retried by the next pass.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use kube::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use application_sync_controller::config::ControllerConfig;
use application_sync_controller::constants::{FIELD_MANAGER, MIN_SYNC_INTERVAL_SECS};
use application_sync_controller::controller::converter::DefaultConverter;
use application_sync_controller::controller::reconciler::{PassSummary, Reconciler};
use application_sync_controller::model::DesiredState;
use application_sync_controller::observability::{self, metrics};
use application_sync_controller::provider::kubernetes::KubernetesBackend;
use application_sync_controller::provider::memory::MemoryBackend;
use application_sync_controller::server::{start_server, ServerState};

#[derive(Debug, Parser)]
#[command(name = "application-sync-controller")]
#[command(
    about = "Reconciles directory applications into runtime Application resources",
    long_about = None,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ", built ", env!("BUILD_DATETIME"), ")")
)]
struct Cli {
    /// Desired-state snapshot (YAML or JSON); overrides DESIRED_STATE_PATH
    #[arg(long, value_name = "PATH")]
    desired_state: Option<PathBuf>,

    /// Seconds between passes; overrides SYNC_INTERVAL_SECS
    #[arg(long, value_name = "SECONDS")]
    interval_secs: Option<u64>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Reconcile against in-memory stores instead of the cluster
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ControllerConfig::from_env();
    if let Some(path) = cli.desired_state {
        config.desired_state_path = path;
    }
    if let Some(interval) = cli.interval_secs {
        config.sync_interval_secs = interval.max(MIN_SYNC_INTERVAL_SECS);
    }

    observability::init_logging(&config.log_level, config.log_format)?;

    info!(
        "Starting Application Sync Controller (build {}, {})",
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    if config.enable_metrics {
        metrics::register_metrics()?;
    }

    let server_state = Arc::new(ServerState::default());
    if !cli.once {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    let reconciler = if cli.dry_run {
        warn!("Dry run: changes are applied to in-memory stores only");
        build_memory_reconciler(&config)
    } else {
        build_kubernetes_reconciler(&config).await?
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, finishing in-flight applications");
                cancel.cancel();
            }
        });
    }

    loop {
        match run_pass(&reconciler, &config.desired_state_path, &cancel).await {
            Ok(summary) => {
                info!("Pass completed: {}", summary);
                server_state.mark_ready();
            }
            Err(e) => error!("Pass failed: {:#}", e),
        }

        if cli.once || cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(config.sync_interval()) => {}
        }
    }

    info!("Controller stopped");
    Ok(())
}

async fn build_kubernetes_reconciler(config: &ControllerConfig) -> Result<Reconciler> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let backend = KubernetesBackend::new(
        client,
        config.namespace.clone(),
        FIELD_MANAGER,
        config.managed_by.clone(),
    );

    Ok(Reconciler::new(
        Arc::new(backend.applications()),
        Arc::new(DefaultConverter::new(config.managed_by.clone())),
        Arc::new(backend.assets()),
        Arc::new(backend.credentials()),
        Arc::new(backend.request_parameters()),
    )
    .with_max_concurrency(config.max_concurrent_applications)
    .with_list_filter(config.managed_selector()))
}

fn build_memory_reconciler(config: &ControllerConfig) -> Reconciler {
    let backend = MemoryBackend::new();
    Reconciler::new(
        Arc::new(backend.applications()),
        Arc::new(DefaultConverter::new(config.managed_by.clone())),
        Arc::new(backend.assets()),
        Arc::new(backend.credentials()),
        Arc::new(backend.request_parameters()),
    )
    .with_max_concurrency(config.max_concurrent_applications)
    .with_list_filter(config.managed_selector())
}

fn load_desired_state(path: &Path) -> Result<DesiredState> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read desired state from {}", path.display()))?;
    DesiredState::from_yaml_str(&document)
        .with_context(|| format!("Failed to parse desired state in {}", path.display()))
}

async fn run_pass(
    reconciler: &Reconciler,
    desired_state_path: &Path,
    cancel: &CancellationToken,
) -> Result<PassSummary> {
    let desired = load_desired_state(desired_state_path)?;
    let results = reconciler
        .apply_with_cancellation(&desired.applications, cancel)
        .await?;

    for result in results.iter().filter(|result| !result.is_success()) {
        if let Some(error) = &result.error {
            warn!(
                "{} of application {} failed: {}",
                result.operation, result.application_name, error
            );
        }
    }

    Ok(PassSummary::from_results(&results))
}
