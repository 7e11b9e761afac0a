use std::path::PathBuf;

use clap::{Parser, Subcommand};

use proxy_testbed::config::{load_config, TestbedConfig};
use proxy_testbed::lifecycle::wait_for_ctrl_c;
use proxy_testbed::observability::{logging, metrics};
use proxy_testbed::{OriginServer, ProxyServer};

#[derive(Parser)]
#[command(name = "proxy-testbed")]
#[command(about = "Caching forward proxy and multi-queue origin server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the caching forward proxy
    Proxy {
        /// Listen address, overrides proxy.bind_address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run the static file origin server
    Origin {
        /// Listen address, overrides origin.bind_address
        #[arg(short, long)]
        bind: Option<String>,

        /// Document root, overrides origin.document_root
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TestbedConfig::default(),
    };

    logging::init_logging(&config.observability.log_filter);
    tracing::info!("proxy-testbed v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let handle = match cli.command {
        Commands::Proxy { bind } => {
            if let Some(bind) = bind {
                config.proxy.bind_address = bind;
            }
            tracing::info!(
                bind_address = %config.proxy.bind_address,
                cache_capacity = config.cache.capacity,
                cache_ttl_secs = config.cache.ttl_secs,
                "Configuration loaded"
            );
            ProxyServer::bind(&config)?.spawn()?
        }
        Commands::Origin { bind, root } => {
            if let Some(bind) = bind {
                config.origin.bind_address = bind;
            }
            if let Some(root) = root {
                config.origin.document_root = root;
            }
            tracing::info!(
                bind_address = %config.origin.bind_address,
                num_queues = config.dispatch.num_queues,
                threads_per_queue = config.dispatch.threads_per_queue,
                "Configuration loaded"
            );
            OriginServer::bind(&config)?.spawn()?
        }
    };

    tracing::info!(address = %handle.local_addr(), "Listening for connections");
    wait_for_ctrl_c()?;
    handle.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
