//! swarmscaled: the swarmscale daemon.
//!
//! Single binary that assembles:
//! - Latency ingestion server (`POST /time`) and telemetry read-out
//! - Sample window shared with the control loop
//! - Autoscaler control loop driving Docker Swarm
//!
//! # Usage
//!
//! ```text
//! swarmscaled --config /etc/swarmscale.toml
//! swarmscaled --service web --docker-host tcp://10.2.9.108:2375
//! swarmscaled --dry-run --dry-run-replicas 2
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use swarmscale_autoscale::Autoscaler;
use swarmscale_core::{AutoscalerConfig, InMemoryOrchestrator, Orchestrator};
use swarmscale_metrics::{SampleBuffer, TelemetryLog};
use swarmscale_swarm::{DockerSwarm, Endpoint};

#[derive(Parser, Debug)]
#[command(
    name = "swarmscaled",
    about = "Latency-driven autoscaler for Docker Swarm services",
    version
)]
struct Cli {
    /// Path to swarmscale.toml. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the ingestion server (overrides server.listen).
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Worker service to scale (overrides service.name).
    #[arg(long)]
    service: Option<String>,

    /// Docker endpoint, unix:// or tcp:// (overrides orchestrator.endpoint).
    #[arg(long)]
    docker_host: Option<String>,

    /// Scale an in-memory service instead of talking to Docker.
    #[arg(long)]
    dry_run: bool,

    /// Starting replica count for --dry-run (default: min_instances).
    #[arg(long, requires = "dry_run")]
    dry_run_replicas: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,swarmscale=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let dry_run = cli
        .dry_run
        .then(|| cli.dry_run_replicas.unwrap_or(config.scaling.min_instances));

    run(config, dry_run).await
}

/// Build the effective config: file (or defaults), then CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<AutoscalerConfig> {
    let mut config = match &cli.config {
        Some(path) => AutoscalerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AutoscalerConfig::default(),
    };

    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(service) = &cli.service {
        config.service.name = service.clone();
    }
    if let Some(host) = &cli.docker_host {
        config.orchestrator.endpoint = host.clone();
    }

    config.validate().context("invalid configuration")?;
    Endpoint::parse(&config.orchestrator.endpoint).context("invalid configuration")?;
    Ok(config)
}

async fn run(config: AutoscalerConfig, dry_run: Option<u32>) -> anyhow::Result<()> {
    info!(service = %config.service.name, "swarmscale daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let buffer = SampleBuffer::from_config(&config.window);
    info!(mode = ?config.window.mode, capacity = config.window.capacity, "sample window initialized");

    let telemetry = TelemetryLog::new();

    let swarm = match dry_run {
        Some(_) => None,
        None => Some(DockerSwarm::from_config(&config.orchestrator)?),
    };

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start the control loop ─────────────────────────────────

    let autoscale_handle = match swarm {
        Some(orchestrator) => {
            info!(endpoint = ?orchestrator.endpoint(), "docker swarm orchestrator configured");
            spawn_autoscaler(orchestrator, &config, &buffer, &telemetry, shutdown_rx)
        }
        None => {
            let replicas = dry_run.unwrap_or(config.scaling.min_instances);
            info!(replicas, "dry run: scaling an in-memory service");
            let orchestrator = InMemoryOrchestrator::with_service(&config.service.name, replicas);
            spawn_autoscaler(orchestrator, &config, &buffer, &telemetry, shutdown_rx)
        }
    };

    // ── Start ingestion server ─────────────────────────────────

    let router = swarmscale_api::build_router(buffer, telemetry);
    info!(addr = %config.server.listen, "ingestion server starting");

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Let an in-flight decision cycle finish.
    let _ = autoscale_handle.await;

    info!("swarmscale daemon stopped");
    Ok(())
}

fn spawn_autoscaler<O: Orchestrator + 'static>(
    orchestrator: O,
    config: &AutoscalerConfig,
    buffer: &SampleBuffer,
    telemetry: &TelemetryLog,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let autoscaler = Autoscaler::new(
        orchestrator,
        config.scaling.clone(),
        config.service.name.clone(),
        buffer.clone(),
    )
    .with_telemetry(telemetry.clone());

    tokio::spawn(async move {
        autoscaler.run(shutdown).await;
    })
}
