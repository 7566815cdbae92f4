//! Cell layout and run driver.

use crate::config::{SimulatorConfig, TrafficPattern, TrafficProfile};
use crate::error::SimulatorError;
use crate::metrics::SimulationReport;
use crate::workload::{BurstTraffic, PingTraffic, UniformTraffic};
use ptmp_core::TrafficGenerator;
use ptmp_simulation::{NetworkBuilder, SimulationRunner};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Layout draws use their own stream so the station seeds stay unchanged.
const LAYOUT_STREAM: u64 = 1;

/// Builds a cell from a [`SimulatorConfig`] and runs it.
pub struct Simulator {
    config: SimulatorConfig,
    runner: SimulationRunner,
}

impl Simulator {
    /// Lay out the cell.
    ///
    /// Clients are placed between half the maximum range and the maximum
    /// range. The first `bursty_clients` get bursty traffic, the next
    /// `ping_clients` only ping, the rest get normal traffic.
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        config.traffic.validate()?;
        if !config.max_range_m.is_finite() || config.max_range_m < 0.0 {
            return Err(SimulatorError::InvalidMaxRange(config.max_range_m));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.network.seed);
        rng.set_stream(LAYOUT_STREAM);

        let mut builder = NetworkBuilder::new(config.network.clone());
        builder.set_base(Some(base_traffic(config.base_pattern, &config.traffic)));

        let bursty = config.bursty_clients.min(config.clients);
        let ping = config.ping_clients.min(config.clients - bursty);
        for index in 0..config.clients {
            let distance = if config.max_range_m > 0.0 {
                rng.gen_range(config.max_range_m / 2.0..=config.max_range_m)
            } else {
                0.0
            };
            let traffic: Box<dyn TrafficGenerator> = if index < bursty {
                bursty_traffic(&config.traffic)
            } else if index < bursty + ping {
                Box::new(PingTraffic::new(
                    config.traffic.ping_interval,
                    config.traffic.ping_size,
                ))
            } else {
                normal_traffic(&config.traffic)
            };
            let id = builder.add_client(distance, Some(traffic));
            debug!(station = %id, distance_m = distance, "Placed client");
        }

        let mut runner = builder.build()?;
        if let Some(at) = config.switch_at {
            runner.schedule_mode_switch(at, config.network.mode.toggled());
        }

        info!(
            clients = config.clients,
            bursty,
            ping,
            base = %config.base_pattern,
            mode = %config.network.mode,
            "Simulator ready"
        );

        Ok(Self { config, runner })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut SimulationRunner {
        &mut self.runner
    }

    /// Run for the configured duration.
    pub fn run(&mut self) -> Result<SimulationReport, SimulatorError> {
        let duration = self.config.duration;
        self.run_for(duration)
    }

    /// Run `duration` more simulated time and report on everything so far.
    pub fn run_for(&mut self, duration: Duration) -> Result<SimulationReport, SimulatorError> {
        let start = Instant::now();
        let end = self.runner.now() + duration;
        self.runner.run_until(end)?;
        let wall = start.elapsed();

        info!(
            simulated = ?self.runner.now(),
            wall = ?wall,
            events = self.runner.stats().events_processed,
            "Run complete"
        );
        Ok(SimulationReport::collect(&self.runner, &self.config, wall))
    }
}

fn base_traffic(pattern: TrafficPattern, traffic: &TrafficProfile) -> Box<dyn TrafficGenerator> {
    match pattern {
        TrafficPattern::Ping => Box::new(PingTraffic::new(traffic.ping_interval, traffic.ping_size)),
        TrafficPattern::Bursty => {
            let (min, max) = traffic.bursty_periods();
            Box::new(UniformTraffic::new(min, max, traffic.size_min, traffic.size_max))
        }
        TrafficPattern::Normal => normal_traffic(traffic),
    }
}

fn bursty_traffic(traffic: &TrafficProfile) -> Box<dyn TrafficGenerator> {
    match traffic.burst_length {
        Some(length) => Box::new(BurstTraffic::new(
            traffic.period_min,
            traffic.period_max,
            length,
            traffic.size_min,
            traffic.size_max,
        )),
        None => {
            let (min, max) = traffic.bursty_periods();
            Box::new(UniformTraffic::new(min, max, traffic.size_min, traffic.size_max))
        }
    }
}

fn normal_traffic(traffic: &TrafficProfile) -> Box<dyn TrafficGenerator> {
    Box::new(UniformTraffic::new(
        traffic.period_min,
        traffic.period_max,
        traffic.size_min,
        traffic.size_max,
    ))
}
