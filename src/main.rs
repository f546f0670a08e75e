//! Spark Cluster Manager
//!
//! Command-line front end for the per-user Spark cluster lifecycle:
//!
//! ```text
//! spark-cluster-manager create --username alice [--worker-count 2 ...]
//! spark-cluster-manager status --username alice
//! spark-cluster-manager delete --username alice
//! ```
//!
//! Settings come from the environment or the matching flags (see
//! [`ManagerConfig`]) and are checked before anything else runs. Results are
//! printed to stdout as JSON; logs go to stderr.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spark_cluster_manager::{
    ClusterConfig, ClusterLifecycleController, ClusterResourceApiRef, Error, InMemoryResourceApi,
    KubeResourceApi, ManagerConfig, Result, TemplateManifestBuilder,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Spark Cluster Manager - per-user Spark clusters on Kubernetes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    /// Run in standalone mode (no Kubernetes)
    #[arg(long, env = "STANDALONE", global = true)]
    standalone: bool,

    #[command(flatten)]
    config: ManagerConfig,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace a user's cluster
    Create(CreateArgs),
    /// Show the readiness of a user's cluster
    Status(UserArgs),
    /// Delete a user's cluster
    Delete(UserArgs),
}

#[derive(ClapArgs, Debug)]
struct UserArgs {
    /// Owner of the cluster
    #[arg(long)]
    username: String,
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    #[command(flatten)]
    user: UserArgs,

    /// Number of workers
    #[arg(long)]
    worker_count: Option<u32>,

    /// CPU cores per worker
    #[arg(long)]
    worker_cores: Option<u32>,

    /// Memory per worker, e.g. 10G
    #[arg(long)]
    worker_memory: Option<String>,

    /// CPU cores for the master
    #[arg(long)]
    master_cores: Option<u32>,

    /// Memory for the master, e.g. 10G
    #[arg(long)]
    master_memory: Option<String>,

    /// Allow sizes above the configured defaults
    #[arg(long)]
    unrestricted: bool,
}

impl CreateArgs {
    /// Requested size, falling back to the configured defaults
    fn cluster_config(&self, config: &ManagerConfig) -> ClusterConfig {
        let defaults = ClusterConfig::from(&config.defaults);
        ClusterConfig {
            worker_count: self.worker_count.unwrap_or(defaults.worker_count),
            worker_cores: self.worker_cores.unwrap_or(defaults.worker_cores),
            worker_memory: self
                .worker_memory
                .clone()
                .unwrap_or(defaults.worker_memory),
            master_cores: self.master_cores.unwrap_or(defaults.master_cores),
            master_memory: self
                .master_memory
                .clone()
                .unwrap_or(defaults.master_memory),
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    info!("Starting Spark Cluster Manager");
    info!("  Version: {}", spark_cluster_manager::VERSION);
    info!("  Standalone mode: {}", args.standalone);

    if let Err(e) = run(args).await {
        let kind = e.kind();
        error!(code = ?kind.code(), "{}: {}", kind.description(), e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = Arc::new(args.config);
    info!("  Namespace: {}", config.namespace);

    let api: ClusterResourceApiRef = if args.standalone {
        Arc::new(InMemoryResourceApi::new())
    } else {
        Arc::new(KubeResourceApi::try_default().await?)
    };

    let builder = match &config.template_dir {
        Some(dir) => {
            info!("  Template directory: {}", dir.display());
            TemplateManifestBuilder::with_template_dir(dir)
        }
        None => TemplateManifestBuilder::new(),
    };

    let controller = |username: &str| {
        ClusterLifecycleController::new(
            username,
            config.clone(),
            api.clone(),
            Arc::new(builder.clone()),
        )
    };

    match &args.command {
        Command::Create(create) => {
            let request = create.cluster_config(&config);
            request.validate()?;
            if !create.unrestricted {
                request.check_limits(&config.defaults)?;
            }
            print_json(&controller(&create.user.username).create(&request).await?)
        }
        Command::Status(user) => print_json(&controller(&user.username).status().await),
        Command::Delete(user) => print_json(&controller(&user.username).delete().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        filter = filter.add_directive(directive.parse().map_err(|e| {
            Error::Configuration(format!("Invalid log directive {}: {}", directive, e))
        })?);
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
