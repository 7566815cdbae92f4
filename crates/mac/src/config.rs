//! MAC timing and policy configuration.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Timing constants and limits shared by every station of a cell.
///
/// All durations are stored in microseconds so a TOML file can override any
/// of them; missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacConfig {
    /// Inter-frame space before a backoff countdown or a coordinator copy.
    pub ifs_us: u64,

    /// Short inter-frame space before a BlockAck.
    pub sifs_us: u64,

    /// Backoff slot duration.
    pub slot_us: u64,

    /// Minimum contention window (slots).
    pub cw_min: u32,

    /// Maximum contention window (slots).
    pub cw_max: u32,

    /// ACK frame size in bytes, used for the acknowledgment timeout.
    pub ack_size: usize,

    /// BlockAck frame size in bytes.
    pub block_ack_size: usize,

    /// POLL frame size in bytes.
    pub poll_size: usize,

    /// Processing delay before a POLL is put on the medium.
    pub poll_overhead_us: u64,

    /// Lower bound of the random transmit processing jitter.
    pub tx_jitter_min_us: u64,

    /// Upper bound of the random transmit processing jitter.
    pub tx_jitter_max_us: u64,

    /// TDMA polling window granted to each station.
    pub poll_period_us: u64,

    /// Retransmissions allowed per frame before it is dropped.
    ///
    /// `None` retries forever.
    pub max_retries: Option<u32>,

    /// Queued ping responses older than this are discarded and counted lost.
    pub ping_stale_ms: u64,

    /// Ping round trips at or above this are not recorded.
    pub ping_latency_cap_ms: u64,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            ifs_us: 34,
            sifs_us: 13,
            slot_us: 9,
            cw_min: 15,
            cw_max: 1023,
            ack_size: 14,
            block_ack_size: 64,
            poll_size: 64,
            poll_overhead_us: 20,
            tx_jitter_min_us: 4,
            tx_jitter_max_us: 40,
            poll_period_us: 5_000,
            max_retries: Some(7),
            ping_stale_ms: 500,
            ping_latency_cap_ms: 1_000,
        }
    }
}

impl MacConfig {
    /// Set the retransmission limit (`None` for unlimited).
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the TDMA polling window.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period_us = period.as_micros() as u64;
        self
    }

    /// Set the contention window bounds.
    pub fn with_contention_window(mut self, cw_min: u32, cw_max: u32) -> Self {
        self.cw_min = cw_min;
        self.cw_max = cw_max;
        self
    }

    pub fn ifs(&self) -> Duration {
        Duration::from_micros(self.ifs_us)
    }

    pub fn sifs(&self) -> Duration {
        Duration::from_micros(self.sifs_us)
    }

    pub fn slot(&self) -> Duration {
        Duration::from_micros(self.slot_us)
    }

    pub fn poll_overhead(&self) -> Duration {
        Duration::from_micros(self.poll_overhead_us)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_micros(self.poll_period_us)
    }

    pub fn ping_stale(&self) -> Duration {
        Duration::from_millis(self.ping_stale_ms)
    }

    pub fn ping_latency_cap(&self) -> Duration {
        Duration::from_millis(self.ping_latency_cap_ms)
    }

    /// Transmit jitter bounds in microseconds, lowest first.
    pub fn tx_jitter_range(&self) -> RangeInclusive<u64> {
        let lo = self.tx_jitter_min_us.min(self.tx_jitter_max_us);
        let hi = self.tx_jitter_min_us.max(self.tx_jitter_max_us);
        lo..=hi
    }

    /// Whether a frame that has failed `retries` times must be dropped.
    pub fn retries_exhausted(&self, retries: u32) -> bool {
        self.max_retries.is_some_and(|max| retries > max)
    }
}
