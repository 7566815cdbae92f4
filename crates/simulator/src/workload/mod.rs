//! Traffic sources for simulations.
//!
//! Every source implements [`ptmp_core::TrafficGenerator`]; the runner
//! schedules arrivals on its behalf. Frames are generated addressed to their
//! own station and the station picks the real destination when it queues
//! them.

mod burst;
mod uniform;

pub use burst::BurstTraffic;
pub use uniform::{ConstantTraffic, PingTraffic, UniformTraffic};

use ptmp_core::ArrivalContext;
use ptmp_types::Frame;
use rand::{Rng, RngCore};
use std::time::Duration;

/// Uniform draw in `[min, max]` at microsecond resolution.
fn uniform_duration(rng: &mut dyn RngCore, min: Duration, max: Duration) -> Duration {
    let lo = min.min(max).as_micros() as u64;
    let hi = min.max(max).as_micros() as u64;
    Duration::from_micros(rng.gen_range(lo..=hi))
}

/// Data frame of a uniformly drawn size, stamped with the current time.
fn data_frame(ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore, min: usize, max: usize) -> Frame {
    let size = rng.gen_range(min.min(max)..=min.max(max));
    Frame::data(ctx.station, size, ctx.phy.airtime(size), ctx.now)
}
