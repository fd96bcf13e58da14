//! API server binary

use clap::{Parser, Subcommand};
use couchmesh::api::{self, ApiState};
use couchmesh::common::{Backend, Config};
use couchmesh::{orchestrator, LifecycleController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "couchmesh-server")]
#[command(about = "HTTP API for provisioning replicated CouchDB clusters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Config file (defaults to ./couchmesh.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<String>,

        /// Orchestrator backend: kubernetes or memory
        #[arg(long)]
        backend: Option<Backend>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            backend,
        } => {
            let mut config = match config {
                Some(path) => Config::load_from(path, true)?,
                None => Config::load()?,
            };
            // CLI has priority over file and environment
            if let Some(bind) = bind {
                config.server.bind_addr = bind.parse()?;
            }
            if let Some(backend) = backend {
                config.backend = backend;
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.server.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            tracing::info!("Starting {}", couchmesh::BUILD_INFO);
            tracing::info!("  HTTP API: {}", config.server.bind_addr);
            tracing::info!("  Backend: {:?}", config.backend);
            tracing::info!("  Replicas: {}", config.cluster.replicas);
            tracing::info!("  Image: {}", config.cluster.image);

            let orchestrator = orchestrator::connect(config.backend).await?;
            let state = ApiState {
                controller: Arc::new(LifecycleController::new(orchestrator, &config.lifecycle)),
                defaults: Arc::new(config.cluster.clone()),
            };

            api::serve(config.server.bind_addr, state).await?;
        }
    }

    Ok(())
}
