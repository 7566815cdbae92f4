//! Physical-layer timing profile.
//!
//! There is no RF model: the PHY only turns payload sizes into airtime and
//! distances into propagation delay.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Radio propagation speed in metres per microsecond.
const METRES_PER_MICROSECOND: f64 = 300.0;

/// Channel bit-rate and fixed per-frame PHY overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyProfile {
    /// Channel bit-rate in Mbit/s.
    pub rate_mbps: u32,
    /// PLCP preamble and PHY header duration in microseconds.
    pub overhead_us: u64,
}

impl Default for PhyProfile {
    fn default() -> Self {
        Self {
            rate_mbps: 150,
            overhead_us: 32,
        }
    }
}

impl PhyProfile {
    /// Create a profile with the given bit-rate and the default overhead.
    pub fn with_rate(rate_mbps: u32) -> Self {
        Self {
            rate_mbps,
            ..Default::default()
        }
    }

    /// Fixed PHY overhead added to every frame.
    pub fn overhead(&self) -> Duration {
        Duration::from_micros(self.overhead_us)
    }

    /// Time needed to clock `bytes` of payload onto the medium.
    ///
    /// A zero bit-rate yields zero payload time; the builder rejects such
    /// profiles before a run starts.
    pub fn payload_time(&self, bytes: usize) -> Duration {
        if self.rate_mbps == 0 {
            return Duration::ZERO;
        }
        // bits / Mbit/s = microseconds; scale to nanoseconds first.
        let nanos = (bytes as u64) * 8 * 1_000 / u64::from(self.rate_mbps);
        Duration::from_nanos(nanos)
    }

    /// Total airtime of a frame carrying `bytes` of payload.
    pub fn airtime(&self, bytes: usize) -> Duration {
        self.payload_time(bytes) + self.overhead()
    }

    /// Effective data rate in Mbit/s for `useful` airtime spent over `elapsed`.
    pub fn data_rate_mbps(&self, useful: Duration, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            return 0.0;
        }
        useful.as_secs_f64() * f64::from(self.rate_mbps) / elapsed.as_secs_f64()
    }
}

/// One-way propagation delay over `distance_m` metres.
pub fn propagation_delay(distance_m: f64) -> Duration {
    let nanos = (distance_m.max(0.0) * 1_000.0 / METRES_PER_MICROSECOND).round();
    Duration::from_nanos(nanos as u64)
}
