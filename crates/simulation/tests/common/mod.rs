//! Shared helpers for simulation tests.

#![allow(dead_code)]

use ptmp_core::{Arrival, ArrivalContext, TrafficGenerator};
use ptmp_simulation::{NetworkBuilder, NetworkConfig, SimulationRunner};
use ptmp_types::{Frame, NetworkMode};
use rand::{Rng, RngCore};
use std::time::Duration;

/// Fixed-size frames at a fixed interval, starting at a random offset.
pub struct Periodic {
    pub interval: Duration,
    pub size: usize,
}

impl Periodic {
    pub fn boxed(interval: Duration, size: usize) -> Option<Box<dyn TrafficGenerator>> {
        Some(Box::new(Self { interval, size }))
    }
}

impl TrafficGenerator for Periodic {
    fn name(&self) -> &'static str {
        "periodic"
    }

    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration {
        Duration::from_micros(rng.gen_range(0..self.interval.as_micros() as u64))
    }

    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, _rng: &mut dyn RngCore) -> Arrival {
        Arrival {
            frame: Frame::data(ctx.station, self.size, ctx.phy.airtime(self.size), ctx.now),
            next: Some(self.interval),
        }
    }
}

/// A base and `clients` clients spread between 1 and 4 km.
///
/// Every station, the base included, sends 1500-byte frames every
/// `interval` when one is given.
pub fn cell(
    clients: usize,
    mode: NetworkMode,
    seed: u64,
    interval: Option<Duration>,
) -> SimulationRunner {
    let config = NetworkConfig::default().with_mode(mode).with_seed(seed);
    let mut builder = NetworkBuilder::new(config);
    builder.enable_trace();
    builder.set_base(interval.and_then(|interval| Periodic::boxed(interval * 2, 1500)));
    for i in 0..clients {
        let distance = 1_000.0 + 1_000.0 * i as f64;
        builder.add_client(
            distance,
            interval.and_then(|interval| Periodic::boxed(interval, 1500)),
        );
    }
    builder.build().expect("valid network")
}
