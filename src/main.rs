use std::{path::PathBuf, process};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};

use stagehand::{
    config::{Config, Preset},
    driver::sim::SimulatedBackend,
    registry::AxisRegistry,
    service::StageService,
};

/// TCP line-protocol controller for motorized stages
#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(version)]
struct Args {
    /// TOML configuration file. Takes precedence over --preset.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Built-in deployment to serve when no config file is given.
    #[arg(long, value_enum, default_value_t = Preset::FourAxis)]
    preset: Preset,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    info!("stagehand v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("Terminating. {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load(path)?
        }
        None => {
            info!("Using the {:?} preset", args.preset);
            args.preset.config()
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // no vendor backend is linked; serve simulated stages with the configured serials
    let backend = SimulatedBackend::with_serials(config.axes.iter().map(|a| a.serial.as_str()));
    let registry = AxisRegistry::open(&backend, &config.axes).await?;

    let service = StageService::start(config, registry).await?;
    info!("Listening on {}", service.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");
    service.shutdown().await
}
