//! End-of-run report.

use crate::config::SimulatorConfig;
use ptmp_mac::LatencyStats;
use ptmp_simulation::SimulationRunner;
use ptmp_types::{NetworkMode, StationId};
use std::time::Duration;

/// Summary of one latency distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub p99: Duration,
}

impl LatencySummary {
    /// `None` when nothing was recorded.
    pub fn from_stats(stats: &LatencyStats) -> Option<Self> {
        if stats.is_empty() {
            return None;
        }
        Some(Self {
            samples: stats.count(),
            mean: stats.mean(),
            min: stats.min(),
            max: stats.max(),
            p99: stats.quantile(0.99),
        })
    }
}

/// Ping round trips, averaged over the stations that completed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingSummary {
    /// Stations with at least one completed round trip.
    pub stations: usize,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Largest round trip seen by any station.
    pub worst: Duration,
}

/// Per-station results.
#[derive(Debug, Clone)]
pub struct StationReport {
    pub id: StationId,
    pub is_base: bool,
    /// Name of the station's traffic source.
    pub traffic: Option<&'static str>,
    /// Frames taken from the queue.
    pub frames_sent: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub retransmissions: u64,
    pub collisions: u64,
    /// Frames waiting when the run ended.
    pub backlog: usize,
    pub useful_airtime: Duration,
    pub data_rate_mbps: f64,
    pub ping: Option<LatencySummary>,
    pub ping_lost: u64,
}

/// Results of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub seed: u64,
    pub clients: usize,
    /// Simulated time covered.
    pub simulated: Duration,
    /// Wall-clock time the run took.
    pub wall: Duration,
    pub events_processed: u64,
    pub final_mode: NetworkMode,
    pub mode_switches: u64,

    /// Expected load in frames per second.
    pub offered_load_pps: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub retransmissions: u64,
    pub collisions: u64,
    pub duplicates: u64,
    pub useful_airtime: Duration,
    /// Sum of per-station data rates, in Mbit/s.
    pub data_rate_mbps: f64,
    /// One-way latency of every received frame.
    pub latency: Option<LatencySummary>,
    pub ping: Option<PingSummary>,
    /// Stale ping responses discarded.
    pub ping_lost: u64,
    /// Frames waiting when the run ended, per client.
    pub mean_backlog: f64,

    pub stations: Vec<StationReport>,
}

impl SimulationReport {
    /// Collect the report from a finished run.
    pub fn collect(runner: &SimulationRunner, config: &SimulatorConfig, wall: Duration) -> Self {
        let simulated = runner.now();
        let phy = runner.phy();

        let stations: Vec<StationReport> = runner
            .stations()
            .iter()
            .map(|station| {
                let stats = station.stats();
                StationReport {
                    id: station.id(),
                    is_base: station.is_coordinator(),
                    traffic: runner.traffic_source(station.id()),
                    frames_sent: stats.frames_sent,
                    delivered: stats.delivered,
                    dropped: stats.dropped,
                    retransmissions: stats.retransmissions,
                    collisions: stats.collisions,
                    backlog: station.queue_len() + usize::from(station.in_flight().is_some()),
                    useful_airtime: stats.useful_airtime,
                    data_rate_mbps: phy.data_rate_mbps(stats.useful_airtime, simulated),
                    ping: LatencySummary::from_stats(&stats.ping),
                    ping_lost: stats.ping.lost,
                }
            })
            .collect();

        let totals = runner.totals();
        let backlog: usize = stations.iter().map(|station| station.backlog).sum();
        let clients = stations.iter().filter(|station| !station.is_base).count();

        Self {
            seed: config.network.seed,
            clients,
            simulated,
            wall,
            events_processed: runner.stats().events_processed,
            final_mode: runner.mode(),
            mode_switches: runner.stats().mode_switches,
            offered_load_pps: config.offered_load_pps(),
            delivered: totals.delivered,
            dropped: totals.dropped,
            retransmissions: totals.retransmissions,
            collisions: totals.collisions,
            duplicates: totals.duplicates,
            useful_airtime: totals.useful_airtime,
            data_rate_mbps: stations.iter().map(|station| station.data_rate_mbps).sum(),
            latency: LatencySummary::from_stats(&totals.latency),
            ping: ping_summary(&stations),
            ping_lost: totals.ping.lost,
            mean_backlog: if clients == 0 {
                0.0
            } else {
                backlog as f64 / clients as f64
            },
            stations,
        }
    }

    /// One line with the headline numbers, for scripting sweeps.
    ///
    /// Columns: offered load (pps), data rate (Mbit/s), mean/min/max ping
    /// (ms), worst ping (ms), mean backlog, lost pings.
    pub fn summary_line(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1e3;
        let (mean, min, max, worst) = self
            .ping
            .map(|ping| (ms(ping.mean), ms(ping.min), ms(ping.max), ms(ping.worst)))
            .unwrap_or_default();
        format!(
            "{} {:.3} {:.3} {:.3} {:.3} {:.3} {:.2} {}",
            self.offered_load_pps,
            self.data_rate_mbps,
            mean,
            min,
            max,
            worst,
            self.mean_backlog,
            self.ping_lost
        )
    }

    /// Print a human-readable summary; `verbose` adds one line per station.
    pub fn print_summary(&self, verbose: bool) {
        println!("\n═══════════════════════════════════════════");
        println!("         PtMP SIMULATION REPORT            ");
        println!("═══════════════════════════════════════════");
        println!();
        println!("Network:");
        println!("  Clients:       {}", self.clients);
        println!("  Final mode:    {}", self.final_mode);
        println!("  Mode switches: {}", self.mode_switches);
        println!("  Seed:          {}", self.seed);
        println!();
        println!("Frames:");
        println!("  Offered load:    {} pps", self.offered_load_pps);
        println!("  Delivered:       {}", self.delivered);
        println!("  Dropped:         {}", self.dropped);
        println!("  Retransmissions: {}", self.retransmissions);
        println!("  Collisions:      {}", self.collisions);
        println!("  Duplicates:      {}", self.duplicates);
        println!("  Mean backlog:    {:.2}", self.mean_backlog);
        println!();
        println!("Throughput:");
        println!("  Useful airtime: {:.3}s", self.useful_airtime.as_secs_f64());
        println!("  Data rate:      {:.3} Mbps", self.data_rate_mbps);
        println!();
        if let Some(latency) = &self.latency {
            println!("Latency (one-way):");
            println!("  Avg:  {:.3}ms", latency.mean.as_secs_f64() * 1e3);
            println!("  Min:  {:.3}ms", latency.min.as_secs_f64() * 1e3);
            println!("  P99:  {:.3}ms", latency.p99.as_secs_f64() * 1e3);
            println!("  Max:  {:.3}ms", latency.max.as_secs_f64() * 1e3);
            println!();
        }
        if let Some(ping) = &self.ping {
            println!("Ping ({} stations):", ping.stations);
            println!("  Avg:   {:.3}ms", ping.mean.as_secs_f64() * 1e3);
            println!("  Min:   {:.3}ms", ping.min.as_secs_f64() * 1e3);
            println!("  Max:   {:.3}ms", ping.max.as_secs_f64() * 1e3);
            println!("  Worst: {:.3}ms", ping.worst.as_secs_f64() * 1e3);
            println!("  Lost:  {}", self.ping_lost);
            println!();
        }
        if verbose {
            println!("Stations:");
            for station in &self.stations {
                let role = if station.is_base { "base" } else { "client" };
                let ping = station
                    .ping
                    .map(|ping| {
                        format!(
                            " ping {:.3}/{:.3}/{:.3}ms",
                            ping.mean.as_secs_f64() * 1e3,
                            ping.min.as_secs_f64() * 1e3,
                            ping.max.as_secs_f64() * 1e3
                        )
                    })
                    .unwrap_or_default();
                println!(
                    "  {:>4} {:<6} {:<8} sent {:>7} delivered {:>7} dropped {:>5} queue {:>5} {:.3} Mbps{}",
                    station.id.to_string(),
                    role,
                    station.traffic.unwrap_or("-"),
                    station.frames_sent,
                    station.delivered,
                    station.dropped,
                    station.backlog,
                    station.data_rate_mbps,
                    ping
                );
            }
            println!();
        }
        println!(
            "Duration: {:.2}s (simulated: {:.3}s, {} events)",
            self.wall.as_secs_f64(),
            self.simulated.as_secs_f64(),
            self.events_processed
        );
        println!("═══════════════════════════════════════════\n");
    }
}

fn ping_summary(stations: &[StationReport]) -> Option<PingSummary> {
    let pings: Vec<LatencySummary> = stations.iter().filter_map(|station| station.ping).collect();
    if pings.is_empty() {
        return None;
    }
    let n = pings.len() as u32;
    let sum = |f: fn(&LatencySummary) -> Duration| pings.iter().map(f).sum::<Duration>();
    Some(PingSummary {
        stations: pings.len(),
        mean: sum(|p| p.mean) / n,
        min: sum(|p| p.min) / n,
        max: sum(|p| p.max) / n,
        worst: pings.iter().map(|p| p.max).max().unwrap_or_default(),
    })
}
