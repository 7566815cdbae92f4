//! Uniformly distributed traffic and its fixed-rate variants.

use super::{data_frame, uniform_duration};
use ptmp_core::{Arrival, ArrivalContext, TrafficGenerator};
use ptmp_types::AppTag;
use rand::RngCore;
use std::time::Duration;

/// Frames of uniform size at uniformly distributed intervals.
#[derive(Debug, Clone)]
pub struct UniformTraffic {
    period_min: Duration,
    period_max: Duration,
    size_min: usize,
    size_max: usize,
    start: Option<Duration>,
    app: Option<AppTag>,
}

impl UniformTraffic {
    pub fn new(period_min: Duration, period_max: Duration, size_min: usize, size_max: usize) -> Self {
        Self {
            period_min,
            period_max,
            size_min,
            size_max,
            start: None,
            app: None,
        }
    }

    /// Fix the first arrival instead of drawing it from `[0, period_max]`.
    pub fn with_start(mut self, start: Duration) -> Self {
        self.start = Some(start);
        self
    }

    /// Tag every generated frame.
    pub fn with_app(mut self, app: AppTag) -> Self {
        self.app = Some(app);
        self
    }
}

impl TrafficGenerator for UniformTraffic {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration {
        match self.start {
            Some(start) => start,
            None => uniform_duration(rng, Duration::ZERO, self.period_max),
        }
    }

    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore) -> Arrival {
        let mut frame = data_frame(ctx, rng, self.size_min, self.size_max);
        frame.app = self.app;
        Arrival {
            frame,
            next: Some(uniform_duration(rng, self.period_min, self.period_max)),
        }
    }
}

/// Fixed interval, sizes drawn from a range.
#[derive(Debug, Clone)]
pub struct ConstantTraffic(UniformTraffic);

impl ConstantTraffic {
    pub fn new(interval: Duration, size_min: usize, size_max: usize) -> Self {
        Self(UniformTraffic::new(
            interval,
            interval,
            size_min,
            size_max.max(size_min),
        ))
    }

    pub fn with_start(self, start: Duration) -> Self {
        Self(self.0.with_start(start))
    }
}

impl TrafficGenerator for ConstantTraffic {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration {
        self.0.first_arrival(rng)
    }

    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore) -> Arrival {
        self.0.next_arrival(ctx, rng)
    }
}

/// Echo requests of a fixed size at a fixed interval.
///
/// The receiver answers each request; the round trip is measured when the
/// response comes back.
#[derive(Debug, Clone)]
pub struct PingTraffic(UniformTraffic);

impl PingTraffic {
    pub fn new(interval: Duration, size: usize) -> Self {
        Self(UniformTraffic::new(interval, interval, size, size).with_app(AppTag::PingRequest))
    }
}

impl TrafficGenerator for PingTraffic {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration {
        self.0.first_arrival(rng)
    }

    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore) -> Arrival {
        self.0.next_arrival(ctx, rng)
    }
}
