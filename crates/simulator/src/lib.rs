//! PtMP Simulator
//!
//! Runs a point-to-multipoint cell with a realistic traffic mix and reports
//! throughput, latency and ping statistics.
//!
//! # Architecture
//!
//! The simulator builds on `ptmp-simulation` to provide:
//!
//! - **Cell layout**: clients placed at random distances from the base
//! - **Workloads**: uniform, bursty, constant-rate and ping traffic sources
//! - **Reports**: data rate, one-way latency, ping round trips and backlog
//! - **Configuration**: builder-style setup plus TOML overrides for MAC timing
//!
//! # Example
//!
//! ```no_run
//! use ptmp_simulator::{Simulator, SimulatorConfig};
//! use ptmp_types::NetworkMode;
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new(10)
//!     .with_bursty_clients(2)
//!     .with_ping_clients(2)
//!     .with_mode(NetworkMode::Tdma)
//!     .with_duration(Duration::from_secs(10));
//!
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run()?;
//!
//! println!("Data rate: {:.3} Mbps", report.data_rate_mbps);
//! println!("{}", report.summary_line());
//! # Ok::<(), ptmp_simulator::SimulatorError>(())
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod workload;

pub use config::{load_mac_config, SimulatorConfig, TrafficPattern, TrafficProfile};
pub use error::SimulatorError;
pub use metrics::{LatencySummary, PingSummary, SimulationReport, StationReport};
pub use runner::Simulator;
pub use workload::{BurstTraffic, ConstantTraffic, PingTraffic, UniformTraffic};
