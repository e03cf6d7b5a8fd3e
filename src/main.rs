//! herdsim - offline CLI entry point
//!
//! Runs the herd simulation without a backend, for tuning and inspection.

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use herdsim::{benchmark, CattleRegistry, Config, HerdEngine, Pasture};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "herdsim")]
#[command(version)]
#[command(about = "Synthetic cattle herd movement and stray-detection simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation offline
    Simulate {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "herdsim.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "720")]
        ticks: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write the final herd payload as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// Herd size
        #[arg(short, long, default_value = "500")]
        cattle: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "herdsim.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            ticks,
            seed,
            output,
            quiet,
        } => run_simulation(config, ticks, seed, output, quiet),

        Commands::Benchmark { ticks, cattle } => run_benchmark(ticks, cattle),

        Commands::Init { output } => generate_config(output),
    }
}

fn run_simulation(
    config_path: PathBuf,
    ticks: u64,
    seed: Option<u64>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };

    let registry = match &config.simulator.registry_path {
        Some(path) => CattleRegistry::load(path),
        None => CattleRegistry::default(),
    };

    let mut engine = match seed.or(config.simulator.seed) {
        Some(s) => {
            println!("Using seed: {}", s);
            HerdEngine::new_with_seed(config.herd.clone(), Pasture::default(), registry, s)
        }
        None => HerdEngine::new(config.herd.clone(), Pasture::default(), registry),
    };

    println!("Starting simulation");
    println!("  Cattle: {}", engine.herd().len());
    println!("  Designated strays: {}", engine.stats().designated_stray_count);
    println!("  Tick interval: {} ms", config.simulator.update_interval_ms);
    println!("  Ticks: {}", ticks);
    println!();

    let interval = Duration::milliseconds(config.simulator.update_interval_ms as i64);
    let stats_interval = config.logging.stats_interval;
    let mut now = Utc::now();
    let start = Instant::now();

    for _ in 0..ticks {
        let report = engine.tick(now);

        if !quiet && report.tick % stats_interval == 0 {
            println!("{}", engine.stats_at(now).summary());
        }
        now += interval;
    }

    let elapsed = start.elapsed();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", engine.tick_count());
    println!("Speed: {:.1} ticks/s", ticks as f64 / elapsed.as_secs_f64());
    println!("{}", engine.stats().summary());

    if !engine.alerts().is_empty() {
        println!();
        println!("Away from the herd:");
        for alert in engine.alerts() {
            let closest = match (&alert.closest_cow, alert.distance_to_closest_meters) {
                (Some(cow), Some(meters)) => format!("{:.0} m from {}", meters, cow.name),
                _ => "no cow nearby".to_string(),
            };
            println!("  {} ({}) for {}, {}", alert.name, alert.cow_id, alert.duration, closest);
        }
    }

    if let Some(path) = output {
        let payload = engine.payload(now);
        std::fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
        println!("Final herd: {:?}", path);
    }

    Ok(())
}

fn run_benchmark(ticks: u64, cattle: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== herdsim Benchmark ===");
    println!("Ticks: {}", ticks);
    println!("Cattle: {}", cattle);
    println!();

    let result = benchmark(ticks, cattle);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
