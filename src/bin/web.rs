//! Herd simulator service entry point.
//!
//! Run with: cargo run --bin herdsim-web -- --backend-url http://localhost:8082
//!
//! Pushes the herd to the ranch backend every tick and serves the admin API
//! on http://127.0.0.1:9100.

use clap::Parser;
use herdsim::config::{Config, ConfigError};
use herdsim::simulation::Simulator;
use herdsim::upstream::RanchClient;
use herdsim::web::{run_server, AppState};
use herdsim::{CattleRegistry, HerdEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "herdsim-web")]
#[command(about = "Herd simulator service - feeds the ranch backend and serves an admin API")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "herdsim.yaml")]
    config: String,

    /// Address to bind the admin API to
    #[arg(short, long)]
    bind: Option<String>,

    /// Base URL of the ranch backend
    #[arg(long, env = "RANCH_OS_URL")]
    backend_url: Option<String>,

    /// Milliseconds between ticks
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config before the logger so its level applies
    let (mut config, source) = load_config(&args.config);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()),
    )
    .init();

    match source {
        Some(path) => log::info!("Loaded config from: {}", path),
        None => log::info!("Using default configuration"),
    }

    // Command line overrides
    if let Some(bind) = args.bind {
        config.simulator.bind = bind;
    }
    if let Some(url) = args.backend_url {
        config.upstream.base_url = url;
    }
    if let Some(ms) = args.interval_ms {
        config.simulator.update_interval_ms = ms;
    }
    if let Some(seed) = args.seed {
        config.simulator.seed = Some(seed);
    }
    config.validate()?;

    let bind: SocketAddr = config
        .simulator
        .bind
        .parse()
        .map_err(|e| format!("Invalid bind address '{}': {}", config.simulator.bind, e))?;

    let registry = match &config.simulator.registry_path {
        Some(path) => CattleRegistry::load(path),
        None => CattleRegistry::default(),
    };

    let client = RanchClient::new(&config.upstream);
    log::info!("Ranch backend: {}", client.base_url());

    let pasture = client.load_pasture_or_default().await;

    let mut herd_config = config.herd.clone();
    match client.fetch_herd_config().await {
        Ok(patch) => match herd_config.merged(&patch) {
            Ok(merged) => {
                log::info!("Loaded herd configuration from backend");
                herd_config = merged;
            }
            Err(e) => log::warn!("Ignoring invalid herd configuration from backend: {}", e),
        },
        Err(e) => log::warn!("Could not load herd configuration, using local values: {}", e),
    }

    // Creating the engine generates the initial herd
    let engine = match config.simulator.seed {
        Some(seed) => HerdEngine::new_with_seed(herd_config, pasture, registry, seed),
        None => HerdEngine::new(herd_config, pasture, registry),
    };

    let simulator = Arc::new(
        Simulator::new(
            engine,
            client,
            Duration::from_millis(config.simulator.update_interval_ms),
        )
        .with_stats_interval(config.logging.stats_interval),
    );
    let state = Arc::new(AppState::new(Arc::clone(&simulator)));

    if config.simulator.autostart {
        simulator.start().await;
    }

    println!("Herd admin API available at http://{}", bind);
    run_server(state, bind, shutdown_signal()).await?;

    simulator.stop().await;
    log::info!("Herd simulator shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

/// Load configuration from file or use default
fn load_config(config_path: &str) -> (Config, Option<String>) {
    // Try specified path first, then common locations
    let paths = [config_path, "herdsim.yaml", "config.yaml"];
    for path in paths {
        match Config::from_file(path) {
            Ok(config) => return (config, Some(path.to_string())),
            Err(ConfigError::Io(_)) => continue,
            Err(e) => eprintln!("Skipping config {}: {}", path, e),
        }
    }

    (Config::default(), None)
}
