//! Cell layout and the builder that turns it into a runner.

use crate::controller::ModeController;
use crate::error::ConfigError;
use crate::runner::SimulationRunner;
use ptmp_core::TrafficGenerator;
use ptmp_mac::{MacConfig, Station};
use ptmp_types::{propagation_delay, NetworkMode, PhyProfile, StationId};
use tracing::info;

/// Configuration shared by every station of the simulated cell.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// MAC timing constants.
    pub mac: MacConfig,
    /// Channel bit-rate and PHY overhead.
    pub phy: PhyProfile,
    /// Mode every station starts in.
    pub mode: NetworkMode,
    /// Seed for every random draw of the run.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac: MacConfig::default(),
            phy: PhyProfile::default(),
            mode: NetworkMode::Csma,
            seed: 12345,
        }
    }
}

impl NetworkConfig {
    pub fn with_mac(mut self, mac: MacConfig) -> Self {
        self.mac = mac;
        self
    }

    pub fn with_phy(mut self, phy: PhyProfile) -> Self {
        self.phy = phy;
        self
    }

    pub fn with_mode(mut self, mode: NetworkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations a run cannot make sense of.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phy.rate_mbps == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.mac.poll_period_us == 0 {
            return Err(ConfigError::ZeroPollPeriod);
        }
        ConfigError::check_range(
            "contention window",
            u64::from(self.mac.cw_min),
            u64::from(self.mac.cw_max),
        )?;
        ConfigError::check_range(
            "transmit jitter",
            self.mac.tx_jitter_min_us,
            self.mac.tx_jitter_max_us,
        )
    }
}

/// Hands out dense station ids; the base always gets the first one.
#[derive(Debug)]
struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    const BASE: StationId = StationId(0);

    fn new() -> Self {
        Self { next: Self::BASE.0 + 1 }
    }

    fn allocate(&mut self) -> StationId {
        let id = StationId(self.next);
        self.next += 1;
        id
    }
}

struct ClientSpec {
    id: StationId,
    distance_m: f64,
    traffic: Option<Box<dyn TrafficGenerator>>,
}

/// Assembles a cell: one base, its clients and their traffic sources.
///
/// ```ignore
/// let mut builder = NetworkBuilder::new(NetworkConfig::default());
/// builder.set_base(None);
/// let client = builder.add_client(2_500.0, Some(Box::new(traffic)));
/// let mut runner = builder.build()?;
/// runner.run_until(Duration::from_secs(1))?;
/// ```
pub struct NetworkBuilder {
    config: NetworkConfig,
    ids: IdAllocator,
    base: Option<Option<Box<dyn TrafficGenerator>>>,
    clients: Vec<ClientSpec>,
    controller: Option<Box<dyn ModeController>>,
    trace: bool,
}

impl NetworkBuilder {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ids: IdAllocator::new(),
            base: None,
            clients: Vec::new(),
            controller: None,
            trace: false,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Add the base coordinator, optionally with its own traffic.
    ///
    /// Calling this again replaces the base's traffic source.
    pub fn set_base(&mut self, traffic: Option<Box<dyn TrafficGenerator>>) -> StationId {
        self.base = Some(traffic);
        IdAllocator::BASE
    }

    /// Add a client `distance_m` metres away from the base.
    pub fn add_client(
        &mut self,
        distance_m: f64,
        traffic: Option<Box<dyn TrafficGenerator>>,
    ) -> StationId {
        let id = self.ids.allocate();
        self.clients.push(ClientSpec {
            id,
            distance_m,
            traffic,
        });
        id
    }

    /// Sample `controller` periodically and apply its decisions.
    pub fn set_controller(&mut self, controller: Box<dyn ModeController>) {
        self.controller = Some(controller);
    }

    /// Record every processed event.
    pub fn enable_trace(&mut self) {
        self.trace = true;
    }

    /// Validate the layout and create the runner.
    pub fn build(self) -> Result<SimulationRunner, ConfigError> {
        self.config.validate()?;
        let Some(base_traffic) = self.base else {
            return Err(ConfigError::MissingBase);
        };
        if self.clients.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        let NetworkConfig {
            mac,
            phy,
            mode,
            seed,
        } = self.config;

        let mut base = Station::coordinator(IdAllocator::BASE, mac.clone(), phy, seed).with_mode(mode);
        let mut stations = Vec::with_capacity(self.clients.len() + 1);
        let mut generators = Vec::with_capacity(self.clients.len() + 1);
        generators.push(base_traffic);

        for client in self.clients {
            if !client.distance_m.is_finite() || client.distance_m < 0.0 {
                return Err(ConfigError::InvalidDistance {
                    station: client.id,
                    distance_m: client.distance_m,
                });
            }
            let propagation = propagation_delay(client.distance_m);
            base.associate(client.id, propagation);
            stations.push(
                Station::client(client.id, IdAllocator::BASE, propagation, mac.clone(), phy, seed)
                    .with_mode(mode),
            );
            generators.push(client.traffic);
        }
        stations.insert(0, base);

        info!(
            clients = stations.len() - 1,
            mode = %mode,
            rate_mbps = phy.rate_mbps,
            seed,
            "Built network"
        );

        Ok(SimulationRunner::new(
            stations,
            generators,
            phy,
            seed,
            self.controller,
            self.trace,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gets_first_id() {
        let mut builder = NetworkBuilder::new(NetworkConfig::default());
        let a = builder.add_client(100.0, None);
        let base = builder.set_base(None);
        let b = builder.add_client(200.0, None);

        assert_eq!(base, StationId(0));
        assert_eq!(a, StationId(1));
        assert_eq!(b, StationId(2));
    }

    #[test]
    fn test_missing_base() {
        let mut builder = NetworkBuilder::new(NetworkConfig::default());
        builder.add_client(100.0, None);
        assert_eq!(builder.build().err(), Some(ConfigError::MissingBase));
    }

    #[test]
    fn test_empty_roster() {
        let mut builder = NetworkBuilder::new(NetworkConfig::default());
        builder.set_base(None);
        assert_eq!(builder.build().err(), Some(ConfigError::EmptyRoster));
    }

    #[test]
    fn test_zero_rate() {
        let config = NetworkConfig::default().with_phy(PhyProfile::with_rate(0));
        let mut builder = NetworkBuilder::new(config);
        builder.set_base(None);
        builder.add_client(100.0, None);
        assert_eq!(builder.build().err(), Some(ConfigError::ZeroRate));
    }

    #[test]
    fn test_inverted_contention_window() {
        let config = NetworkConfig::default()
            .with_mac(MacConfig::default().with_contention_window(1023, 15));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRange {
                what: "contention window",
                min: 1023,
                max: 15
            })
        );
    }

    #[test]
    fn test_negative_distance() {
        let mut builder = NetworkBuilder::new(NetworkConfig::default());
        builder.set_base(None);
        let id = builder.add_client(-1.0, None);
        assert_eq!(
            builder.build().err(),
            Some(ConfigError::InvalidDistance {
                station: id,
                distance_m: -1.0
            })
        );
    }

    #[test]
    fn test_roster_follows_insertion_order() {
        let mut builder = NetworkBuilder::new(NetworkConfig::default());
        builder.set_base(None);
        builder.add_client(3_000.0, None);
        builder.add_client(1_500.0, None);
        let runner = builder.build().unwrap();

        let base = runner.base_station().coordinator_state().unwrap();
        assert_eq!(base.roster(), &[StationId(1), StationId(2)]);
        assert_eq!(
            base.propagation(StationId(1)),
            Some(std::time::Duration::from_micros(10))
        );
    }
}
