//! Per-station counters and latency distributions.

use hdrhistogram::Histogram;
use std::time::Duration;
use tracing::warn;

/// Latency distribution in microseconds.
#[derive(Debug, Clone)]
pub struct LatencyStats {
    histogram: Histogram<u64>,
    /// Samples discarded before being measured (stale ping responses).
    pub lost: u64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            histogram: Histogram::new(3).expect("histogram creation should succeed"),
            lost: 0,
        }
    }
}

impl LatencyStats {
    pub fn record(&mut self, latency: Duration) {
        self.histogram
            .saturating_record(latency.as_micros().min(u128::from(u64::MAX)) as u64);
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    pub fn mean(&self) -> Duration {
        Duration::from_micros(self.histogram.mean().round() as u64)
    }

    pub fn min(&self) -> Duration {
        Duration::from_micros(self.histogram.min())
    }

    pub fn max(&self) -> Duration {
        Duration::from_micros(self.histogram.max())
    }

    /// Latency at quantile `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Duration {
        Duration::from_micros(self.histogram.value_at_quantile(q))
    }

    /// Fold another distribution into this one.
    pub fn merge(&mut self, other: &LatencyStats) {
        if let Err(e) = self.histogram.add(&other.histogram) {
            warn!(error = ?e, "Failed to merge latency histogram");
        }
        self.lost += other.lost;
    }
}

/// Counters accumulated by one station over a run.
#[derive(Debug, Clone, Default)]
pub struct StationStats {
    /// Frames taken from the queue for a first transmission.
    pub frames_sent: u64,
    /// Data transmissions, first attempts and retransmissions.
    pub transmissions: u64,
    /// Retransmissions of a frame already sent.
    pub retransmissions: u64,
    /// Frames acknowledged by their destination.
    pub delivered: u64,
    /// Frames dropped after exhausting the retry limit.
    pub dropped: u64,
    /// Payload airtime of acknowledged frames.
    pub useful_airtime: Duration,
    /// Overlapping receptions.
    pub collisions: u64,
    /// Addressed data frames accepted (first copy only).
    pub received: u64,
    /// Addressed data frames already seen.
    pub duplicates: u64,
    /// One-way delivery latency of received frames.
    pub latency: LatencyStats,
    /// Round-trip latency of completed pings.
    pub ping: LatencyStats,
}

impl StationStats {
    /// Fold another station's counters into this one.
    pub fn merge(&mut self, other: &StationStats) {
        self.frames_sent += other.frames_sent;
        self.transmissions += other.transmissions;
        self.retransmissions += other.retransmissions;
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.useful_airtime += other.useful_airtime;
        self.collisions += other.collisions;
        self.received += other.received;
        self.duplicates += other.duplicates;
        self.latency.merge(&other.latency);
        self.ping.merge(&other.ping);
    }
}
