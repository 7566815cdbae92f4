//! PtMP cell simulator CLI.
//!
//! Runs one cell and prints a report followed by a one-line summary.

use clap::Parser;
use ptmp_simulator::{load_mac_config, Simulator, SimulatorConfig, TrafficPattern, TrafficProfile};
use ptmp_types::NetworkMode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ptmp-sim")]
#[command(version, about = "Hybrid CSMA/TDMA point-to-multipoint MAC simulator", long_about = None)]
struct Args {
    /// Number of clients
    #[arg(short = 'n', long, default_value = "15")]
    clients: usize,

    /// Simulated time (e.g., "100s", "2m")
    #[arg(short = 't', long, default_value = "100s")]
    duration: humantime::Duration,

    /// Maximum client distance from the base, in metres
    #[arg(short = 'd', long, default_value = "5000")]
    range: f64,

    /// Bursty clients divide their periods by this factor
    #[arg(short = 'f', long, default_value = "5")]
    factor: u32,

    /// Clients with bursty traffic
    #[arg(short = 'b', long, default_value = "0")]
    bursty: usize,

    /// Clients that only ping the base
    #[arg(short = 'l', long, default_value = "0")]
    ping: usize,

    /// Base traffic pattern (ping, bursty, normal)
    #[arg(short = 'B', long, default_value = "ping")]
    base: TrafficPattern,

    /// Smallest frame size in bytes
    #[arg(short = 'm', long, default_value = "1500")]
    min_size: usize,

    /// Largest frame size in bytes
    #[arg(short = 'M', long, default_value = "16384")]
    max_size: usize,

    /// Shortest time between frames, in milliseconds
    #[arg(short = 'p', long, default_value = "20")]
    min_period: u64,

    /// Longest time between frames, in milliseconds
    #[arg(short = 'P', long, default_value = "40")]
    max_period: u64,

    /// Channel bit-rate in Mbit/s
    #[arg(short = 'r', long, default_value = "150")]
    rate: u32,

    /// Bursty clients send back-to-back bursts of up to this many frames
    #[arg(long)]
    burst_length: Option<u32>,

    /// Initial network mode (csma, tdma)
    #[arg(long, default_value = "csma")]
    mode: NetworkMode,

    /// Switch to the other mode at this time (e.g., "50s")
    #[arg(long)]
    switch_at: Option<humantime::Duration>,

    /// Retransmissions per frame before it is dropped
    #[arg(long, default_value = "7")]
    max_retries: u32,

    /// Retransmit until delivered
    #[arg(long)]
    unlimited_retries: bool,

    /// TOML file overriding MAC timing
    #[arg(long)]
    mac_config: Option<PathBuf>,

    /// Random seed (random if not specified)
    #[arg(long)]
    seed: Option<u64>,

    /// Print per-station results
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,ptmp_simulator=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mac = match &args.mac_config {
        Some(path) => load_mac_config(path)?,
        None => Default::default(),
    };
    let max_retries = if args.unlimited_retries {
        None
    } else {
        Some(args.max_retries)
    };

    let traffic = TrafficProfile::default()
        .with_periods(
            Duration::from_millis(args.min_period),
            Duration::from_millis(args.max_period),
        )
        .with_sizes(args.min_size, args.max_size)
        .with_burst_factor(args.factor)
        .with_burst_length(args.burst_length);

    let config = SimulatorConfig::new(args.clients)
        .with_duration(args.duration.into())
        .with_max_range(args.range)
        .with_bursty_clients(args.bursty)
        .with_ping_clients(args.ping)
        .with_base_pattern(args.base)
        .with_traffic(traffic)
        .with_mac(mac.with_max_retries(max_retries))
        .with_rate(args.rate)
        .with_mode(args.mode)
        .with_seed(seed)
        .with_switch_at(args.switch_at.map(Into::into));

    info!(
        clients = config.clients,
        duration = ?config.duration,
        mode = %config.network.mode,
        rate_mbps = args.rate,
        seed,
        "Starting simulation"
    );

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run()?;

    report.print_summary(args.verbose);
    println!("{}", report.summary_line());

    Ok(())
}
