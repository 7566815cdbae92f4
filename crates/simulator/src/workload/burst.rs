//! Back-to-back bursts separated by idle periods.

use super::{data_frame, uniform_duration};
use ptmp_core::{Arrival, ArrivalContext, TrafficGenerator};
use rand::{Rng, RngCore};
use std::time::Duration;

/// Gap between two frames of the same burst.
const BURST_GAP: Duration = Duration::from_micros(2);

/// Bursts of 1 to `max_burst` frames, then an idle period drawn from the
/// period range.
#[derive(Debug, Clone)]
pub struct BurstTraffic {
    period_min: Duration,
    period_max: Duration,
    max_burst: u32,
    size_min: usize,
    size_max: usize,
    start: Option<Duration>,
    /// Frames left in the current burst.
    remaining: u32,
}

impl BurstTraffic {
    pub fn new(
        period_min: Duration,
        period_max: Duration,
        max_burst: u32,
        size_min: usize,
        size_max: usize,
    ) -> Self {
        Self {
            period_min,
            period_max,
            max_burst: max_burst.max(1),
            size_min,
            size_max,
            start: None,
            remaining: 0,
        }
    }

    pub fn with_start(mut self, start: Duration) -> Self {
        self.start = Some(start);
        self
    }
}

impl TrafficGenerator for BurstTraffic {
    fn name(&self) -> &'static str {
        "burst"
    }

    fn first_arrival(&mut self, rng: &mut dyn RngCore) -> Duration {
        match self.start {
            Some(start) => start,
            None => uniform_duration(rng, Duration::ZERO, self.period_max),
        }
    }

    fn next_arrival(&mut self, ctx: &ArrivalContext<'_>, rng: &mut dyn RngCore) -> Arrival {
        if self.remaining == 0 {
            self.remaining = rng.gen_range(1..=self.max_burst);
        }
        let frame = data_frame(ctx, rng, self.size_min, self.size_max);
        self.remaining -= 1;

        let next = if self.remaining > 0 {
            BURST_GAP
        } else {
            uniform_duration(rng, self.period_min, self.period_max)
        };
        Arrival {
            frame,
            next: Some(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptmp_types::{PhyProfile, StationId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_bursts_are_bounded_and_tightly_spaced() {
        let phy = PhyProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut traffic = BurstTraffic::new(
            Duration::from_millis(50),
            Duration::from_millis(150),
            8,
            1500,
            1500,
        );

        let mut now = traffic.first_arrival(&mut rng);
        let mut bursts = Vec::new();
        let mut current = 0u32;
        for _ in 0..200 {
            let ctx = ArrivalContext {
                station: StationId(1),
                now,
                phy: &phy,
            };
            let arrival = traffic.next_arrival(&ctx, &mut rng);
            assert_eq!(arrival.frame.size, 1500);
            current += 1;

            let next = arrival.next.unwrap();
            if next == BURST_GAP {
                continue;
            }
            assert!(next >= Duration::from_millis(50) && next <= Duration::from_millis(150));
            bursts.push(current);
            current = 0;
            now += next;
        }

        assert!(bursts.len() > 10);
        assert!(bursts.iter().all(|len| (1..=8).contains(len)));
        assert!(bursts.iter().any(|len| *len > 1));
    }

    #[test]
    fn test_single_frame_bursts() {
        let phy = PhyProfile::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut traffic = BurstTraffic::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            0,
            64,
            64,
        )
        .with_start(Duration::from_micros(10));

        assert_eq!(traffic.first_arrival(&mut rng), Duration::from_micros(10));
        let ctx = ArrivalContext {
            station: StationId(2),
            now: Duration::ZERO,
            phy: &phy,
        };
        for _ in 0..5 {
            let arrival = traffic.next_arrival(&ctx, &mut rng);
            assert_eq!(arrival.next, Some(Duration::from_millis(1)));
        }
    }
}
