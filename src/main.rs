//! Modelyard CLI
//!
//! Entry point for the service binaries: the REST API server, the gRPC
//! server, and the terminal dashboard.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use modelyard_api::{ApiConfig, ApiServer};
use modelyard_core::dataset::{DatasetService, DatasetStore};
use modelyard_core::integrations::{DvcClient, TrackingClient};
use modelyard_core::models::{AlgorithmRegistry, InferenceService, ModelStore, TrainingService};
use modelyard_core::Settings;
use modelyard_grpc::ModelyardService;

#[derive(Parser)]
#[command(name = "modelyard", version, about = "Model training and registry service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST API server
    Serve {
        /// Bind host (overrides configuration)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the gRPC server
    Grpc {
        /// Bind port (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the terminal dashboard against a REST API
    Dashboard {
        /// REST API base URL
        #[arg(long, default_value = "http://localhost:8000")]
        api_url: String,
    },
}

/// Core services shared by both server surfaces
struct Services {
    datasets: Arc<DatasetService>,
    training: Arc<TrainingService>,
    inference: Arc<InferenceService>,
    models: Arc<ModelStore>,
    registry: Arc<AlgorithmRegistry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    match cli.command {
        Command::Serve { host, port } => {
            let services = build_services(&settings).await?;
            let config = ApiConfig {
                host: host.unwrap_or_else(|| settings.http_host.clone()),
                port: port.unwrap_or(settings.http_port),
                version: env!("CARGO_PKG_VERSION").to_string(),
            };
            ApiServer::new(
                config,
                services.datasets,
                services.training,
                services.inference,
                services.models,
                services.registry,
            )
            .start()
            .await
        }
        Command::Grpc { port } => {
            let services = build_services(&settings).await?;
            let addr = format!("0.0.0.0:{}", port.unwrap_or(settings.grpc_port)).parse()?;
            ModelyardService::new(services.training, services.inference, services.models)
                .serve(addr)
                .await
        }
        Command::Dashboard { api_url } => modelyard_dashboard::run_dashboard(&api_url).await,
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the store and service graph from configuration. Stores are
/// constructed here and passed down explicitly.
async fn build_services(settings: &Settings) -> Result<Services> {
    let dataset_store = Arc::new(DatasetStore::new(&settings.datasets_dir)?);
    let models = Arc::new(ModelStore::new(&settings.models_dir)?);
    let registry = Arc::new(AlgorithmRegistry::builtin());

    let dvc = Arc::new(DvcClient::new(settings));
    dvc.setup().await;
    let tracking = Arc::new(TrackingClient::new(settings));

    let datasets = Arc::new(DatasetService::new(
        dataset_store.clone(),
        models.clone(),
        dvc,
    ));
    let training = Arc::new(TrainingService::new(
        dataset_store,
        models.clone(),
        registry.clone(),
        tracking,
    ));
    let inference = Arc::new(InferenceService::new(models.clone()));

    info!(
        "services initialized (datasets: {}, models: {})",
        settings.datasets_dir.display(),
        settings.models_dir.display()
    );

    Ok(Services {
        datasets,
        training,
        inference,
        models,
        registry,
    })
}
