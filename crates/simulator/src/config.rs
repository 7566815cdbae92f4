//! Configuration types for the simulator.

use crate::error::SimulatorError;
use ptmp_mac::MacConfig;
use ptmp_simulation::{ConfigError, NetworkConfig};
use ptmp_types::{NetworkMode, PhyProfile};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Traffic the base generates for its own clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrafficPattern {
    /// One small echo request per second.
    #[default]
    Ping,
    /// Normal traffic with periods divided by the burst factor.
    Bursty,
    /// Uniform frame sizes and periods.
    Normal,
}

impl fmt::Display for TrafficPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficPattern::Ping => write!(f, "ping"),
            TrafficPattern::Bursty => write!(f, "bursty"),
            TrafficPattern::Normal => write!(f, "normal"),
        }
    }
}

impl FromStr for TrafficPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ping" => Ok(TrafficPattern::Ping),
            "bursty" => Ok(TrafficPattern::Bursty),
            "normal" => Ok(TrafficPattern::Normal),
            other => Err(format!("Unknown traffic pattern: {}", other)),
        }
    }
}

/// Frame size and arrival-period ranges shared by every traffic source.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficProfile {
    /// Shortest time between two frames.
    pub period_min: Duration,

    /// Longest time between two frames.
    pub period_max: Duration,

    /// Smallest frame payload in bytes.
    pub size_min: usize,

    /// Largest frame payload in bytes.
    pub size_max: usize,

    /// Bursty stations divide both periods by this factor.
    pub burst_factor: u32,

    /// When set, bursty stations emit back-to-back bursts of up to this
    /// many frames instead of a faster uniform stream.
    pub burst_length: Option<u32>,

    /// Time between two echo requests.
    pub ping_interval: Duration,

    /// Echo request payload in bytes.
    pub ping_size: usize,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            period_min: Duration::from_millis(20),
            period_max: Duration::from_millis(40),
            size_min: 1500,
            size_max: 16384,
            burst_factor: 5,
            burst_length: None,
            ping_interval: Duration::from_secs(1),
            ping_size: 64,
        }
    }
}

impl TrafficProfile {
    /// Set the arrival-period range.
    pub fn with_periods(mut self, min: Duration, max: Duration) -> Self {
        self.period_min = min;
        self.period_max = max;
        self
    }

    /// Set the frame size range.
    pub fn with_sizes(mut self, min: usize, max: usize) -> Self {
        self.size_min = min;
        self.size_max = max;
        self
    }

    /// Set the factor bursty stations speed up by.
    pub fn with_burst_factor(mut self, factor: u32) -> Self {
        self.burst_factor = factor;
        self
    }

    /// Make bursty stations send bursts of up to `length` frames.
    pub fn with_burst_length(mut self, length: Option<u32>) -> Self {
        self.burst_length = length;
        self
    }

    /// Period range of a bursty station.
    pub fn bursty_periods(&self) -> (Duration, Duration) {
        let factor = self.burst_factor.max(1);
        (self.period_min / factor, self.period_max / factor)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range(
            "period",
            self.period_min.as_micros() as u64,
            self.period_max.as_micros() as u64,
        )?;
        ConfigError::check_range("frame size", self.size_min as u64, self.size_max as u64)?;
        if self.burst_factor == 0 {
            return Err(ConfigError::InvalidRange {
                what: "burst factor",
                min: 1,
                max: 0,
            });
        }
        Ok(())
    }
}

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// Number of clients associated with the base.
    pub clients: usize,

    /// Simulated time to run for.
    pub duration: Duration,

    /// Clients are placed uniformly between half this distance and this
    /// distance from the base, in metres.
    pub max_range_m: f64,

    /// Clients with bursty traffic (taken first).
    pub bursty_clients: usize,

    /// Clients that only ping the base (taken after the bursty ones).
    pub ping_clients: usize,

    /// Traffic generated by the base.
    pub base_pattern: TrafficPattern,

    /// Frame sizes and periods.
    pub traffic: TrafficProfile,

    /// MAC timing, PHY rate, initial mode and seed.
    pub network: NetworkConfig,

    /// Switch to the other mode at this time.
    pub switch_at: Option<Duration>,
}

impl SimulatorConfig {
    /// Create a configuration with `clients` clients and default traffic.
    pub fn new(clients: usize) -> Self {
        Self {
            clients,
            duration: Duration::from_secs(100),
            max_range_m: 5_000.0,
            bursty_clients: 0,
            ping_clients: 0,
            base_pattern: TrafficPattern::default(),
            traffic: TrafficProfile::default(),
            network: NetworkConfig::default(),
            switch_at: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_max_range(mut self, metres: f64) -> Self {
        self.max_range_m = metres;
        self
    }

    pub fn with_bursty_clients(mut self, clients: usize) -> Self {
        self.bursty_clients = clients;
        self
    }

    pub fn with_ping_clients(mut self, clients: usize) -> Self {
        self.ping_clients = clients;
        self
    }

    pub fn with_base_pattern(mut self, pattern: TrafficPattern) -> Self {
        self.base_pattern = pattern;
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficProfile) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_mac(mut self, mac: MacConfig) -> Self {
        self.network.mac = mac;
        self
    }

    /// Set the channel bit-rate in Mbit/s.
    pub fn with_rate(mut self, rate_mbps: u32) -> Self {
        self.network.phy = PhyProfile {
            rate_mbps,
            ..self.network.phy
        };
        self
    }

    pub fn with_mode(mut self, mode: NetworkMode) -> Self {
        self.network.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.network.seed = seed;
        self
    }

    /// Switch to the other mode at `at`.
    pub fn with_switch_at(mut self, at: Option<Duration>) -> Self {
        self.switch_at = at;
        self
    }

    /// Expected offered load in frames per second.
    ///
    /// Normal stations average one frame per 1.5 shortest periods; bursty
    /// stations are `burst_factor` times faster.
    pub fn offered_load_pps(&self) -> u64 {
        let base_period_us = self.traffic.period_min.as_micros() as f64 * 1.5;
        if base_period_us == 0.0 {
            return 0;
        }
        let bursty = self.bursty_clients.min(self.clients) as f64;
        let normal = self.clients as f64 - bursty;
        let factor = f64::from(self.traffic.burst_factor.max(1));

        let normal_load = normal * 1e6 / base_period_us;
        let burst_load = bursty * 1e6 / (base_period_us / factor);
        (normal_load + burst_load) as u64
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(15)
    }
}

/// Load MAC timing overrides from a TOML file.
///
/// Keys missing from the file keep their defaults.
pub fn load_mac_config(path: &Path) -> Result<MacConfig, SimulatorError> {
    let text = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| SimulatorError::MacConfig {
        path: path.to_path_buf(),
        source,
    })
}
