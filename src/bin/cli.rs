//! CLI for cluster operations

use clap::{Parser, Subcommand};
use couchmesh::common::{parse_duration, Backend, Config};
use couchmesh::{orchestrator, ClusterDescriptor, LifecycleController};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "couchmesh")]
#[command(about = "Create and delete replicated CouchDB clusters")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./couchmesh.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Orchestrator backend: kubernetes or memory
    #[arg(long, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a cluster and configure its replication mesh
    Create {
        /// Cluster name (namespace)
        name: String,

        /// Database name (defaults to the cluster name)
        #[arg(long)]
        database: Option<String>,

        /// Number of CouchDB replicas
        #[arg(long)]
        replicas: Option<u32>,

        /// CouchDB image
        #[arg(long)]
        image: Option<String>,

        /// Give up waiting for readiness after this long (e.g. 10m)
        #[arg(long, value_parser = parse_timeout)]
        ready_timeout: Option<Duration>,
    },

    /// Delete a cluster and everything in its namespace
    Delete {
        /// Cluster name (namespace)
        name: String,
    },
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from(path, true)?,
        None => Config::load()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    match cli.command {
        Commands::Create {
            name,
            database,
            replicas,
            image,
            ready_timeout,
        } => {
            if let Some(replicas) = replicas {
                config.cluster.replicas = replicas;
            }
            if let Some(image) = image {
                config.cluster.image = image;
            }
            if let Some(timeout) = ready_timeout {
                config.lifecycle.ready_timeout_ms =
                    Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
            }

            let database = database.unwrap_or_else(|| name.clone());
            let descriptor = ClusterDescriptor::new(&name, &database, &config.cluster)?;

            let orchestrator = orchestrator::connect(config.backend).await?;
            let controller = LifecycleController::new(orchestrator, &config.lifecycle);
            let report = controller.create(&descriptor).await?;

            println!("Cluster {} ready:", report.namespace);
            for instance in &report.instances {
                println!(
                    "  {} {}",
                    instance.id,
                    instance.address.as_deref().unwrap_or("-")
                );
            }
            println!("  Replication edges: {}", report.edges);
        }

        Commands::Delete { name } => {
            let descriptor = ClusterDescriptor::for_teardown(&name)?;
            let orchestrator = orchestrator::connect(config.backend).await?;
            let controller = LifecycleController::new(orchestrator, &config.lifecycle);
            controller.delete(descriptor.namespace()).await?;
            println!("Cluster {} deleting", name);
        }
    }

    Ok(())
}
